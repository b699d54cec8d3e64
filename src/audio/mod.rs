pub mod backend;
pub mod session;

pub use backend::RodioBackend;
pub use session::{AzanSession, PlaybackState, SessionEvent, StartOutcome};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::{AppConfig, Preferences};
use crate::db::KeyValueStore;

/// The session wired to the configured audio file.
pub fn session_from_config(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
    preferences: Arc<dyn Preferences>,
) -> Result<AzanSession> {
    let backend = RodioBackend::new(
        config.audio_path()?,
        Duration::from_secs(config.azan.load_timeout_secs),
    );
    Ok(AzanSession::builder(backend, store, preferences)
        .stale_after(config.stale_after())
        .build())
}
