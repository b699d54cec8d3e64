pub mod desktop;
pub mod scheduler;
pub mod store;

pub use scheduler::{NotificationScheduler, ScheduleReport};
pub use store::DbNotifier;

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::audio::{AzanSession, StartOutcome};
use crate::config::{AppConfig, Preferences};
use crate::db::SharedConn;
use crate::models::{PrayerTimings, PrayerType};
use crate::prayer_times::PrayerTimesService;

/// Reacts to the user acting on a fired reminder.
pub fn respond(session: &AzanSession, payload: PrayerType) -> StartOutcome {
    log::info!("reminder for {} answered, starting azan", payload);
    session.start()
}

/// Load today's timings (cache first) and replace pending reminders.
pub fn schedule_today(
    conn: &SharedConn,
    config: &AppConfig,
    preferences: Arc<dyn Preferences>,
    now: NaiveDateTime,
) -> Result<(PrayerTimings, ScheduleReport)> {
    let service = PrayerTimesService::from_config(config)?;
    let timings = service.get_cached_or_fetch(conn, now.date())?;
    let scheduler = NotificationScheduler::new(
        DbNotifier::new(Arc::clone(conn)),
        preferences,
        config.lead_time(),
    );
    let report = scheduler.schedule_all(&timings, now)?;
    Ok((timings, report))
}
