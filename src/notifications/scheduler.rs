use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};

use crate::config::Preferences;
use crate::models::{PrayerTimings, PrayerType, ScheduledNotification};
use crate::utils::time::next_occurrence;

/// The local notification collaborator.
pub trait Notifier {
    fn cancel_all(&self) -> Result<()>;
    fn schedule_at(&self, notification: &ScheduledNotification) -> Result<()>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    pub scheduled: Vec<PrayerType>,
    /// Inside the lead window; left unscheduled.
    pub skipped: Vec<PrayerType>,
    pub failed: Vec<PrayerType>,
}

/// Turns a day's timings into one reminder per prayer, replacing whatever was
/// scheduled before.
pub struct NotificationScheduler<N> {
    notifier: N,
    preferences: Arc<dyn Preferences>,
    lead: Duration,
}

impl<N: Notifier> NotificationScheduler<N> {
    pub fn new(notifier: N, preferences: Arc<dyn Preferences>, lead: Duration) -> Self {
        Self {
            notifier,
            preferences,
            lead,
        }
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn schedule_all(&self, timings: &PrayerTimings, now: NaiveDateTime) -> Result<ScheduleReport> {
        // Cancelling must finish before anything new is created.
        self.notifier
            .cancel_all()
            .context("Cancelling scheduled reminders")?;

        let mut report = ScheduleReport::default();
        if !self.preferences.notifications_enabled() {
            log::info!("notifications disabled; cleared reminders only");
            return Ok(report);
        }

        for (prayer, time) in timings.iter() {
            let trigger = next_occurrence(now, time);
            if trigger - now <= self.lead {
                log::debug!("{} at {} is within the lead window, skipping", prayer, trigger);
                report.skipped.push(prayer);
                continue;
            }

            let notification = ScheduledNotification::for_prayer(prayer, trigger);
            match self.notifier.schedule_at(&notification) {
                Ok(()) => {
                    log::debug!("scheduled {} reminder for {}", prayer, trigger);
                    report.scheduled.push(prayer);
                }
                Err(e) => {
                    log::warn!("scheduling {} reminder: {:#}", prayer, e);
                    report.failed.push(prayer);
                }
            }
        }

        log::info!(
            "reminders: {} scheduled, {} skipped, {} failed",
            report.scheduled.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
