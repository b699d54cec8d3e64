use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

use crate::models::{PrayerTimings, PrayerType, ScheduledNotification};

const TRIGGER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Cached prayer times ────────────────────────────────────────────────────

pub struct CacheRepo;

impl CacheRepo {
    pub fn get_times_for_date(conn: &Connection, date: &str) -> Result<Option<PrayerTimings>> {
        let row = conn
            .query_row(
                "SELECT fajr, dhuhr, asr, maghrib, isha FROM prayer_times_cache WHERE date = ?1",
                params![date],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((fajr, dhuhr, asr, maghrib, isha)) => {
                let timings = PrayerTimings::parse(&fajr, &dhuhr, &asr, &maghrib, &isha)
                    .map_err(|e| anyhow!("Bad cached times for {}: {}", date, e))?;
                Ok(Some(timings))
            }
        }
    }

    pub fn clear_all(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM prayer_times_cache", [])?;
        Ok(())
    }

    pub fn store_times(conn: &Connection, date: &str, times: &PrayerTimings) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO prayer_times_cache (date, fajr, dhuhr, asr, maghrib, isha)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                date,
                times.fajr.format("%H:%M").to_string(),
                times.dhuhr.format("%H:%M").to_string(),
                times.asr.format("%H:%M").to_string(),
                times.maghrib.format("%H:%M").to_string(),
                times.isha.format("%H:%M").to_string(),
            ],
        )?;
        Ok(())
    }
}

// ─── Scheduled reminders ─────────────────────────────────────────────────────

pub struct NotificationRepo;

impl NotificationRepo {
    pub fn delete_all(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM scheduled_notifications", [])?)
    }

    pub fn insert(conn: &Connection, n: &ScheduledNotification) -> Result<()> {
        conn.execute(
            "INSERT INTO scheduled_notifications (prayer_type, title, body, trigger_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                n.payload.as_str(),
                n.title,
                n.body,
                n.trigger.format(TRIGGER_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn pending(conn: &Connection) -> Result<Vec<ScheduledNotification>> {
        Self::query(
            conn,
            "SELECT prayer_type, title, body, trigger_at FROM scheduled_notifications
             ORDER BY trigger_at, id",
            None,
        )
    }

    /// Remove and return every reminder whose trigger is at or before `now`.
    pub fn take_due(conn: &Connection, now: NaiveDateTime) -> Result<Vec<ScheduledNotification>> {
        let cutoff = now.format(TRIGGER_FORMAT).to_string();
        let tx = conn.unchecked_transaction()?;
        let due = Self::query(
            &tx,
            "SELECT prayer_type, title, body, trigger_at FROM scheduled_notifications
             WHERE trigger_at <= ?1 ORDER BY trigger_at, id",
            Some(&cutoff),
        )?;
        tx.execute(
            "DELETE FROM scheduled_notifications WHERE trigger_at <= ?1",
            params![cutoff],
        )?;
        tx.commit()?;
        Ok(due)
    }

    fn query(
        conn: &Connection,
        sql: &str,
        cutoff: Option<&str>,
    ) -> Result<Vec<ScheduledNotification>> {
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        };
        let rows = match cutoff {
            Some(cutoff) => stmt.query_map(params![cutoff], map_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt.query_map([], map_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
        };

        let mut result = Vec::new();
        for (prayer_type, title, body, trigger_at) in rows {
            result.push(ScheduledNotification {
                title,
                body,
                trigger: NaiveDateTime::parse_from_str(&trigger_at, TRIGGER_FORMAT)
                    .map_err(|e| anyhow!("Bad trigger '{}': {}", trigger_at, e))?,
                payload: PrayerType::from_str(&prayer_type)?,
            });
        }
        Ok(result)
    }
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove(conn: &Connection, key: &str) -> Result<()> {
        conn.execute("DELETE FROM app_meta WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use chrono::NaiveDate;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn cache_round_trips_and_replaces() {
        let conn = conn();
        assert!(CacheRepo::get_times_for_date(&conn, "2024-03-10").unwrap().is_none());

        let first = PrayerTimings::parse("05:00", "12:30", "15:45", "18:20", "19:50").unwrap();
        CacheRepo::store_times(&conn, "2024-03-10", &first).unwrap();
        assert_eq!(CacheRepo::get_times_for_date(&conn, "2024-03-10").unwrap(), Some(first));

        let second = PrayerTimings::parse("05:01", "12:31", "15:46", "18:21", "19:51").unwrap();
        CacheRepo::store_times(&conn, "2024-03-10", &second).unwrap();
        assert_eq!(CacheRepo::get_times_for_date(&conn, "2024-03-10").unwrap(), Some(second));

        CacheRepo::clear_all(&conn).unwrap();
        assert!(CacheRepo::get_times_for_date(&conn, "2024-03-10").unwrap().is_none());
    }

    #[test]
    fn take_due_removes_only_due_reminders() {
        let conn = conn();
        NotificationRepo::insert(&conn, &ScheduledNotification::for_prayer(PrayerType::Asr, at(15, 45))).unwrap();
        NotificationRepo::insert(&conn, &ScheduledNotification::for_prayer(PrayerType::Dhuhr, at(12, 30))).unwrap();
        NotificationRepo::insert(&conn, &ScheduledNotification::for_prayer(PrayerType::Isha, at(19, 50))).unwrap();

        let due = NotificationRepo::take_due(&conn, at(15, 45)).unwrap();
        let prayers: Vec<_> = due.iter().map(|n| n.payload).collect();
        assert_eq!(prayers, vec![PrayerType::Dhuhr, PrayerType::Asr]);

        let pending = NotificationRepo::pending(&conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, PrayerType::Isha);
        assert_eq!(pending[0].trigger, at(19, 50));
    }

    #[test]
    fn meta_set_get_remove() {
        let conn = conn();
        MetaRepo::set(&conn, "k", "1").unwrap();
        MetaRepo::set(&conn, "k", "2").unwrap();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap().as_deref(), Some("2"));
        MetaRepo::remove(&conn, "k").unwrap();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap(), None);
    }
}
