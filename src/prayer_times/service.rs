use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use crate::config::AppConfig;
use crate::db::repository::CacheRepo;
use crate::db::SharedConn;
use crate::models::PrayerTimings;
use crate::prayer_times::provider::{method_id, AladhanClient, PrayerTimeProvider, TimingsRequest};

/// Prayer times for the configured location, fetched once per day and kept
/// in `prayer_times_cache`.
pub struct PrayerTimesService<P> {
    provider: P,
    latitude: f64,
    longitude: f64,
    method: u8,
}

impl PrayerTimesService<AladhanClient> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = AladhanClient::new(
            &config.provider.base_url,
            Duration::from_secs(config.provider.timeout_secs),
        )
        .context("Building HTTP client")?;
        Self::new(
            client,
            config.location.latitude,
            config.location.longitude,
            &config.location.calc_method,
        )
    }
}

impl<P: PrayerTimeProvider> PrayerTimesService<P> {
    pub fn new(provider: P, latitude: f64, longitude: f64, method: &str) -> Result<Self> {
        let method = method_id(method)
            .ok_or_else(|| anyhow!("Unknown calculation method: '{}'", method))?;
        Ok(Self {
            provider,
            latitude,
            longitude,
            method,
        })
    }

    fn request(&self, date: NaiveDate) -> TimingsRequest {
        TimingsRequest {
            date,
            latitude: self.latitude,
            longitude: self.longitude,
            method: self.method,
        }
    }

    /// Cached timings for `date`, fetching (and caching) them on a miss.
    ///
    /// The connection is only locked around cache reads and writes, never
    /// across the network call.
    pub fn get_cached_or_fetch(&self, conn: &SharedConn, date: NaiveDate) -> Result<PrayerTimings> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let cached = CacheRepo::get_times_for_date(&conn.lock(), &date_str)?;
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let timings = self
            .provider
            .fetch(&self.request(date))
            .with_context(|| format!("Fetching prayer times for {}", date_str))?;
        log::info!("fetched prayer times for {}", date_str);
        CacheRepo::store_times(&conn.lock(), &date_str, &timings)?;
        Ok(timings)
    }

    /// Always asks the provider; on failure the cached copy, if any, is kept
    /// and returned.
    pub fn refresh(&self, conn: &SharedConn, date: NaiveDate) -> Result<PrayerTimings> {
        let date_str = date.format("%Y-%m-%d").to_string();
        match self.provider.fetch(&self.request(date)) {
            Ok(timings) => {
                log::info!("refreshed prayer times for {}", date_str);
                CacheRepo::store_times(&conn.lock(), &date_str, &timings)?;
                Ok(timings)
            }
            Err(e) => {
                log::warn!("refreshing prayer times for {}: {}", date_str, e);
                let cached = CacheRepo::get_times_for_date(&conn.lock(), &date_str)?;
                cached
                    .ok_or_else(|| anyhow!(e))
                    .with_context(|| format!("Fetching prayer times for {}", date_str))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::db::store::share;
    use crate::prayer_times::provider::FetchError;
    use rusqlite::Connection;
    use std::cell::{Cell, RefCell};

    struct FakeProvider {
        calls: Cell<u32>,
        fail: Cell<bool>,
        timings: PrayerTimings,
        /// When set, records whether this connection was free during `fetch`.
        watch: RefCell<Option<SharedConn>>,
        lock_free_during_fetch: Cell<Option<bool>>,
    }

    impl FakeProvider {
        fn new(fajr: &str) -> Self {
            Self {
                calls: Cell::new(0),
                fail: Cell::new(false),
                timings: PrayerTimings::parse(fajr, "12:30", "15:45", "18:20", "19:50").unwrap(),
                watch: RefCell::new(None),
                lock_free_during_fetch: Cell::new(None),
            }
        }
    }

    impl PrayerTimeProvider for FakeProvider {
        fn fetch(&self, request: &TimingsRequest) -> Result<PrayerTimings, FetchError> {
            assert_eq!(request.method, 1);
            self.calls.set(self.calls.get() + 1);
            if let Some(conn) = self.watch.borrow().as_ref() {
                self.lock_free_during_fetch.set(Some(conn.try_lock().is_some()));
            }
            if self.fail.get() {
                return Err(FetchError::Malformed("boom".to_string()));
            }
            Ok(self.timings.clone())
        }
    }

    fn setup(fajr: &str) -> (SharedConn, PrayerTimesService<FakeProvider>) {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let service = PrayerTimesService::new(FakeProvider::new(fajr), 33.7, 73.1, "Karachi").unwrap();
        (share(conn), service)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn fetches_once_then_serves_cache() {
        let (conn, service) = setup("05:00");
        let first = service.get_cached_or_fetch(&conn, date()).unwrap();
        let second = service.get_cached_or_fetch(&conn, date()).unwrap();
        assert_eq!(first, second);
        assert_eq!(service.provider.calls.get(), 1);
    }

    #[test]
    fn failed_fetch_without_cache_is_an_error() {
        let (conn, service) = setup("05:00");
        service.provider.fail.set(true);
        assert!(service.get_cached_or_fetch(&conn, date()).is_err());
        assert!(service.refresh(&conn, date()).is_err());
        assert!(CacheRepo::get_times_for_date(&conn.lock(), "2024-03-10")
            .unwrap()
            .is_none());
    }

    #[test]
    fn connection_is_not_held_while_fetching() {
        let (conn, service) = setup("05:00");
        *service.provider.watch.borrow_mut() = Some(conn.clone());

        service.get_cached_or_fetch(&conn, date()).unwrap();
        assert_eq!(service.provider.lock_free_during_fetch.take(), Some(true));

        service.refresh(&conn, date()).unwrap();
        assert_eq!(service.provider.lock_free_during_fetch.take(), Some(true));

        // The fetched timings still reached the cache.
        assert!(CacheRepo::get_times_for_date(&conn.lock(), "2024-03-10")
            .unwrap()
            .is_some());
    }

    #[test]
    fn failed_refresh_keeps_previous_timings() {
        let (conn, service) = setup("05:00");
        let cached = service.refresh(&conn, date()).unwrap();

        service.provider.fail.set(true);
        let after = service.refresh(&conn, date()).unwrap();
        assert_eq!(after, cached);
        assert_eq!(service.provider.calls.get(), 2);
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(PrayerTimesService::new(FakeProvider::new("05:00"), 0.0, 0.0, "Nope").is_err());
    }
}
