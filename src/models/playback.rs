use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted azan state, written on every start/stop transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzanPlaybackState {
    pub is_playing: bool,
    pub timestamp: DateTime<Utc>,
}

impl AzanPlaybackState {
    pub fn new(is_playing: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            is_playing,
            timestamp,
        }
    }

    /// Age relative to `now`; `None` when the timestamp lies in the future.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        let age = now - self.timestamp;
        (age >= Duration::zero()).then_some(age)
    }

    /// Still playing and written no longer than `stale_after` ago.
    pub fn is_fresh_play(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        self.is_playing && self.age(now).is_some_and(|age| age <= stale_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_window() {
        let now = Utc::now();
        let window = Duration::minutes(5);

        assert!(AzanPlaybackState::new(true, now - Duration::minutes(1)).is_fresh_play(now, window));
        assert!(AzanPlaybackState::new(true, now - window).is_fresh_play(now, window));
        assert!(!AzanPlaybackState::new(true, now - Duration::minutes(10)).is_fresh_play(now, window));
        assert!(!AzanPlaybackState::new(false, now).is_fresh_play(now, window));
        assert!(!AzanPlaybackState::new(true, now + Duration::minutes(1)).is_fresh_play(now, window));
    }
}
