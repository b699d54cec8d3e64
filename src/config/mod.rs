pub mod preferences;
pub mod settings;

pub use preferences::{Preferences, StoredPreferences};
pub use settings::AppConfig;
