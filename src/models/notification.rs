use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::PrayerType;

/// A one-shot reminder; `trigger` is local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub title: String,
    pub body: String,
    pub trigger: NaiveDateTime,
    pub payload: PrayerType,
}

impl ScheduledNotification {
    pub fn for_prayer(prayer: PrayerType, trigger: NaiveDateTime) -> Self {
        Self {
            title: format!("{} prayer", prayer.display_name()),
            body: format!(
                "It's time for {} ({}).",
                prayer.display_name(),
                trigger.format("%H:%M")
            ),
            trigger,
            payload: prayer,
        }
    }
}
