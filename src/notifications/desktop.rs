use anyhow::{Context, Result};
use notify_rust::Notification;

use crate::models::ScheduledNotification;

/// Show a fired reminder as a desktop popup.
pub fn show(notification: &ScheduledNotification) -> Result<()> {
    Notification::new()
        .summary(&notification.title)
        .body(&notification.body)
        .appname("miqat")
        .icon("appointment-soon")
        .show()
        .context("Showing desktop notification")?;
    Ok(())
}
