use chrono::NaiveDateTime;

use crate::models::{PrayerTimings, PrayerType};
use crate::utils::time::{next_occurrence, on_same_day};

/// The first prayer, in canonical order, whose time today is strictly after
/// `now`. Once Isha has passed this is Fajr (tomorrow's).
pub fn next_prayer(timings: &PrayerTimings, now: NaiveDateTime) -> PrayerType {
    timings
        .iter()
        .find(|(_, time)| on_same_day(now, *time) > now)
        .map(|(prayer, _)| prayer)
        .unwrap_or(PrayerType::Fajr)
}

/// Like [`next_prayer`], with the instant already rolled to tomorrow when needed.
pub fn next_prayer_at(timings: &PrayerTimings, now: NaiveDateTime) -> (PrayerType, NaiveDateTime) {
    let prayer = next_prayer(timings, now);
    (prayer, next_occurrence(now, timings.time_of(prayer)))
}
