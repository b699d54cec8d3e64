pub mod countdown;
pub mod provider;
pub mod resolver;
pub mod service;

pub use countdown::{countdown, CountdownTick, CountdownTimer};
pub use resolver::next_prayer_at;
pub use service::PrayerTimesService;
