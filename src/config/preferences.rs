use std::sync::Arc;

use anyhow::Result;

use crate::db::KeyValueStore;

pub const AZAN_ENABLED_KEY: &str = "pref.azan_enabled";
pub const NOTIFICATIONS_ENABLED_KEY: &str = "pref.notifications_enabled";

/// User toggles, read at each decision point rather than cached.
pub trait Preferences: Send + Sync {
    fn azan_enabled(&self) -> bool;
    fn notifications_enabled(&self) -> bool;
}

pub struct StoredPreferences {
    store: Arc<dyn KeyValueStore>,
}

impl StoredPreferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn set_azan_enabled(&self, enabled: bool) -> Result<()> {
        self.store.set(AZAN_ENABLED_KEY, flag(enabled))
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.store.set(NOTIFICATIONS_ENABLED_KEY, flag(enabled))
    }

    /// Unset flags default to on.
    fn read(&self, key: &str) -> bool {
        match self.store.get(key) {
            Ok(Some(value)) => value != "0" && value != "false",
            Ok(None) => true,
            Err(e) => {
                log::warn!("reading {}: {:#}", key, e);
                true
            }
        }
    }
}

fn flag(enabled: bool) -> &'static str {
    if enabled { "1" } else { "0" }
}

impl Preferences for StoredPreferences {
    fn azan_enabled(&self) -> bool {
        self.read(AZAN_ENABLED_KEY)
    }

    fn notifications_enabled(&self) -> bool {
        self.read(NOTIFICATIONS_ENABLED_KEY)
    }
}

#[cfg(test)]
pub use fixed::FixedPreferences;
