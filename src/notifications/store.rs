use anyhow::Result;
use chrono::{Duration, NaiveDateTime};

use crate::db::repository::NotificationRepo;
use crate::db::SharedConn;
use crate::models::ScheduledNotification;
use crate::notifications::scheduler::Notifier;

/// Reminders kept in SQLite until the daemon fires them.
#[derive(Clone)]
pub struct DbNotifier {
    conn: SharedConn,
}

impl DbNotifier {
    pub fn new(conn: SharedConn) -> Self {
        Self { conn }
    }

    pub fn pending(&self) -> Result<Vec<ScheduledNotification>> {
        NotificationRepo::pending(&self.conn.lock())
    }

    /// Removes every reminder due by `now`. Those more than `grace` overdue
    /// are dropped instead of returned.
    pub fn take_due(&self, now: NaiveDateTime, grace: Duration) -> Result<Vec<ScheduledNotification>> {
        let due = NotificationRepo::take_due(&self.conn.lock(), now)?;
        let oldest = now - grace;
        let (fresh, stale): (Vec<_>, Vec<_>) = due.into_iter().partition(|n| n.trigger >= oldest);
        for reminder in &stale {
            log::warn!(
                "dropping stale reminder for {} due at {}",
                reminder.payload,
                reminder.trigger
            );
        }
        Ok(fresh)
    }
}

impl Notifier for DbNotifier {
    fn cancel_all(&self) -> Result<()> {
        let removed = NotificationRepo::delete_all(&self.conn.lock())?;
        log::debug!("cancelled {} pending reminders", removed);
        Ok(())
    }

    fn schedule_at(&self, notification: &ScheduledNotification) -> Result<()> {
        NotificationRepo::insert(&self.conn.lock(), notification)
    }
}
