use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS prayer_times_cache (
            date     TEXT PRIMARY KEY,
            fajr     TEXT NOT NULL,
            dhuhr    TEXT NOT NULL,
            asr      TEXT NOT NULL,
            maghrib  TEXT NOT NULL,
            isha     TEXT NOT NULL,
            fetched_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS scheduled_notifications (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            prayer_type TEXT NOT NULL CHECK(prayer_type IN ('fajr','dhuhr','asr','maghrib','isha')),
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            trigger_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scheduled_trigger
            ON scheduled_notifications(trigger_at);

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;
    Ok(())
}
