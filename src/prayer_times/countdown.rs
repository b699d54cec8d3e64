use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Local, NaiveDateTime, NaiveTime};

use crate::models::{PrayerTimings, PrayerType, RemainingTime};
use crate::prayer_times::resolver::next_prayer;
use crate::utils::time::{next_occurrence, parse_hhmm};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Source of the current local wall-clock time.
pub type LocalClock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn local_clock() -> LocalClock {
    Arc::new(|| Local::now().naive_local())
}

/// Time left until the next occurrence of `time`. An instant at or before
/// `now` counts from the same time tomorrow.
pub fn remaining(time: NaiveTime, now: NaiveDateTime) -> RemainingTime {
    let target = next_occurrence(now, time);
    // num_seconds truncates toward zero, which floors a positive span
    let secs = (target - now).num_seconds().max(0) as u64;
    RemainingTime::from_secs(secs)
}

pub fn remaining_str(time: &str, now: NaiveDateTime) -> Result<RemainingTime> {
    Ok(remaining(parse_hhmm(time)?, now))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub prayer: PrayerType,
    pub remaining: RemainingTime,
}

pub fn countdown(timings: &PrayerTimings, now: NaiveDateTime) -> CountdownTick {
    let prayer = next_prayer(timings, now);
    CountdownTick {
        prayer,
        remaining: remaining(timings.time_of(prayer), now),
    }
}

/// Recomputes the countdown on its own thread once per `period`.
///
/// Owners replace the timer whenever the timings change; dropping it stops
/// the thread.
pub struct CountdownTimer {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// `on_tick` returning `false` ends the timer.
    pub fn spawn<F>(
        timings: PrayerTimings,
        clock: LocalClock,
        period: Duration,
        mut on_tick: F,
    ) -> Result<Self>
    where
        F: FnMut(CountdownTick) -> bool + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let thread = thread::Builder::new()
            .name("countdown".to_string())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    if !on_tick(countdown(&timings, clock())) {
                        break;
                    }
                    let deadline = Instant::now() + period;
                    loop {
                        if flag.load(Ordering::Acquire) {
                            return;
                        }
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                }
            })?;

        Ok(Self {
            cancelled,
            thread: Some(thread),
        })
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                log::warn!("countdown thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
