pub mod notification;
pub mod playback;
pub mod prayer;

pub use notification::ScheduledNotification;
pub use playback::AzanPlaybackState;
pub use prayer::{PrayerTimings, PrayerType, RemainingTime};
