use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::audio::backend::{AudioBackend, AudioHandle, OnFinish};
use crate::config::settings::DEFAULT_STALE_AFTER_MINUTES;
use crate::config::Preferences;
use crate::db::KeyValueStore;
use crate::models::AzanPlaybackState;

pub const PLAYBACK_STATE_KEY: &str = "azan.playback_state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
}

impl PlaybackState {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(PlaybackState),
    /// One-line message meant for the user.
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Already loading or playing; nothing was done.
    AlreadyActive,
    Disabled,
    Failed,
    /// `stop()` arrived while the audio was still loading.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Observer = Arc<dyn Fn(&SessionEvent) + Send + Sync>;
pub type UtcClock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct Inner {
    state: PlaybackState,
    handle: Option<Box<dyn AudioHandle>>,
    /// Bumped on every start and stop so late callbacks can tell they are stale.
    generation: u64,
    finished_while_loading: bool,
}

struct Shared {
    backend: Box<dyn AudioBackend>,
    store: Arc<dyn KeyValueStore>,
    preferences: Arc<dyn Preferences>,
    clock: UtcClock,
    inner: Mutex<Inner>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

/// The single azan playback session.
///
/// Cloning is cheap and every clone controls the same session, so it can be
/// handed to the TUI, the daemon and reminder handlers alike. At most one
/// audio handle exists at a time; `Loading` doubles as the start guard.
#[derive(Clone)]
pub struct AzanSession {
    shared: Arc<Shared>,
}

pub struct SessionBuilder {
    backend: Box<dyn AudioBackend>,
    store: Arc<dyn KeyValueStore>,
    preferences: Arc<dyn Preferences>,
    clock: UtcClock,
    stale_after: Duration,
}

impl SessionBuilder {
    pub fn stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn clock(mut self, clock: UtcClock) -> Self {
        self.clock = clock;
        self
    }

    /// Build the session, picking up a recent "playing" state left by a
    /// previous process. The audio itself did not survive, so such a session
    /// reports `Playing` without a handle until `stop()` reconciles it.
    pub fn build(self) -> AzanSession {
        let resumed = restore(self.store.as_ref(), (self.clock)(), self.stale_after);
        let state = if resumed {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        };

        AzanSession {
            shared: Arc::new(Shared {
                backend: self.backend,
                store: self.store,
                preferences: self.preferences,
                clock: self.clock,
                inner: Mutex::new(Inner {
                    state,
                    handle: None,
                    generation: 0,
                    finished_while_loading: false,
                }),
                observers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }
}

fn restore(store: &dyn KeyValueStore, now: DateTime<Utc>, stale_after: Duration) -> bool {
    let raw = match store.get(PLAYBACK_STATE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return false,
        Err(e) => {
            log::warn!("reading playback state: {:#}", e);
            return false;
        }
    };

    let discard = match serde_json::from_str::<AzanPlaybackState>(&raw) {
        Ok(saved) if saved.is_fresh_play(now, stale_after) => {
            log::info!("azan was playing at {}, resuming as playing", saved.timestamp);
            return true;
        }
        Ok(saved) => saved.is_playing || saved.age(now).is_none(),
        Err(e) => {
            log::warn!("ignoring unreadable playback state: {}", e);
            true
        }
    };

    if discard {
        log::debug!("discarding stale playback state");
        if let Err(e) = store.remove(PLAYBACK_STATE_KEY) {
            log::warn!("removing playback state: {:#}", e);
        }
    }
    false
}

impl AzanSession {
    pub fn builder<B>(
        backend: B,
        store: Arc<dyn KeyValueStore>,
        preferences: Arc<dyn Preferences>,
    ) -> SessionBuilder
    where
        B: AudioBackend + 'static,
    {
        SessionBuilder {
            backend: Box::new(backend),
            store,
            preferences,
            clock: Arc::new(Utc::now),
            stale_after: Duration::minutes(DEFAULT_STALE_AFTER_MINUTES),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.inner.lock().state
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.shared.observers.lock().push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.shared.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn start(&self) -> StartOutcome {
        if !self.shared.preferences.azan_enabled() {
            self.notice("Azan playback is turned off in preferences");
            return StartOutcome::Disabled;
        }

        let (generation, leftover) = {
            let mut inner = self.shared.inner.lock();
            if inner.state != PlaybackState::Idle {
                return StartOutcome::AlreadyActive;
            }
            inner.state = PlaybackState::Loading;
            inner.generation += 1;
            inner.finished_while_loading = false;
            (inner.generation, inner.handle.take())
        };
        if let Some(mut handle) = leftover {
            handle.stop();
        }
        self.publish(SessionEvent::StateChanged(PlaybackState::Loading));

        let weak = Arc::downgrade(&self.shared);
        let on_finish: OnFinish = Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                AzanSession { shared }.finished(generation);
            }
        });

        match self.shared.backend.play(on_finish) {
            Ok(mut handle) => {
                let mut inner = self.shared.inner.lock();
                if inner.generation != generation {
                    drop(inner);
                    log::debug!("azan stopped while loading, releasing new handle");
                    handle.stop();
                    return StartOutcome::Cancelled;
                }
                if inner.finished_while_loading {
                    inner.state = PlaybackState::Idle;
                    drop(inner);
                    drop(handle);
                    self.persist(false);
                    self.publish(SessionEvent::StateChanged(PlaybackState::Idle));
                    return StartOutcome::Started;
                }
                inner.handle = Some(handle);
                inner.state = PlaybackState::Playing;
                drop(inner);

                log::info!("azan started");
                self.persist(true);
                self.publish(SessionEvent::StateChanged(PlaybackState::Playing));
                StartOutcome::Started
            }
            Err(e) => {
                let current = {
                    let mut inner = self.shared.inner.lock();
                    let current = inner.generation == generation;
                    if current {
                        inner.state = PlaybackState::Idle;
                    }
                    current
                };
                log::warn!("starting azan: {:#}", e);
                self.notice(&format!("Could not play the azan: {:#}", e));
                if current {
                    self.publish(SessionEvent::StateChanged(PlaybackState::Idle));
                }
                StartOutcome::Failed
            }
        }
    }

    /// Returns `false` when there was nothing to stop.
    pub fn stop(&self) -> bool {
        let handle = {
            let mut inner = self.shared.inner.lock();
            if inner.state == PlaybackState::Idle {
                return false;
            }
            inner.state = PlaybackState::Idle;
            inner.generation += 1;
            inner.handle.take()
        };
        if let Some(mut handle) = handle {
            handle.stop();
        }

        log::info!("azan stopped");
        self.persist(false);
        self.publish(SessionEvent::StateChanged(PlaybackState::Idle));
        true
    }

    fn finished(&self, generation: u64) {
        let handle = {
            let mut inner = self.shared.inner.lock();
            if inner.generation != generation {
                return;
            }
            match inner.state {
                PlaybackState::Idle => return,
                PlaybackState::Loading => {
                    inner.finished_while_loading = true;
                    return;
                }
                PlaybackState::Playing => {}
            }
            inner.state = PlaybackState::Idle;
            inner.generation += 1;
            inner.handle.take()
        };
        if let Some(mut handle) = handle {
            handle.stop();
        }

        log::info!("azan finished");
        self.persist(false);
        self.publish(SessionEvent::StateChanged(PlaybackState::Idle));
    }

    fn persist(&self, is_playing: bool) {
        let state = AzanPlaybackState::new(is_playing, (self.shared.clock)());
        let result = serde_json::to_string(&state)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.shared.store.set(PLAYBACK_STATE_KEY, &json));
        if let Err(e) = result {
            log::warn!("persisting playback state: {:#}", e);
        }
    }

    fn notice(&self, message: &str) {
        self.publish(SessionEvent::Notice(message.to_string()));
    }

    fn publish(&self, event: SessionEvent) {
        // Observers run without the lock so they may call back into the session.
        let observers: Vec<Observer> = self
            .shared
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::preferences::FixedPreferences;
    use crate::db::store::MemoryStore;
    use anyhow::{bail, Result};
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::mpsc;
    use std::thread;

    #[derive(Default)]
    struct Recorder {
        plays: AtomicUsize,
        stops: AtomicUsize,
        live: AtomicUsize,
        fail: AtomicBool,
        /// Report end of stream from inside `play`, before it returns.
        end_during_play: AtomicBool,
        finishers: Mutex<Vec<OnFinish>>,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl Recorder {
        fn finish(&self, index: usize) {
            let finisher = self.finishers.lock().remove(index);
            finisher();
        }
    }

    struct FakeBackend(Arc<Recorder>);

    struct FakeHandle {
        recorder: Arc<Recorder>,
        released: bool,
    }

    impl AudioHandle for FakeHandle {
        fn stop(&mut self) {
            self.recorder.stops.fetch_add(1, Ordering::SeqCst);
            if !self.released {
                self.released = true;
                self.recorder.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            if !self.released {
                self.recorder.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    impl AudioBackend for FakeBackend {
        fn play(&self, on_finish: OnFinish) -> Result<Box<dyn AudioHandle>> {
            let entered = self.0.entered.lock().take();
            if let Some(tx) = entered {
                tx.send(()).unwrap();
            }
            let release = self.0.release.lock().take();
            if let Some(rx) = release {
                rx.recv().unwrap();
            }

            self.0.plays.fetch_add(1, Ordering::SeqCst);
            if self.0.fail.load(Ordering::SeqCst) {
                bail!("no output device");
            }
            self.0.live.fetch_add(1, Ordering::SeqCst);
            let handle = Box::new(FakeHandle {
                recorder: Arc::clone(&self.0),
                released: false,
            });
            if self.0.end_during_play.load(Ordering::SeqCst) {
                on_finish();
            } else {
                self.0.finishers.lock().push(on_finish);
            }
            Ok(handle)
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T13:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    struct Harness {
        session: AzanSession,
        recorder: Arc<Recorder>,
        store: Arc<MemoryStore>,
        prefs: Arc<FixedPreferences>,
        events: Arc<Mutex<Vec<SessionEvent>>>,
    }

    fn harness_with(store: MemoryStore) -> Harness {
        let recorder = Arc::new(Recorder::default());
        let store = Arc::new(store);
        let prefs = Arc::new(FixedPreferences::all_on());
        let session = AzanSession::builder(FakeBackend(Arc::clone(&recorder)), store.clone(), prefs.clone())
            .clock(Arc::new(now))
            .stale_after(Duration::minutes(5))
            .build();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        session.subscribe(move |event| sink.lock().push(event.clone()));

        Harness {
            session,
            recorder,
            store,
            prefs,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStore::default())
    }

    fn persisted(store: &MemoryStore) -> Option<AzanPlaybackState> {
        store
            .get(PLAYBACK_STATE_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    fn saved_at(is_playing: bool, minutes_ago: i64) -> MemoryStore {
        let state = AzanPlaybackState::new(is_playing, now() - Duration::minutes(minutes_ago));
        MemoryStore::with(PLAYBACK_STATE_KEY, &serde_json::to_string(&state).unwrap())
    }

    fn notices(h: &Harness) -> Vec<String> {
        h.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Notice(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_plays_and_persists() {
        let h = harness();
        assert_eq!(h.session.start(), StartOutcome::Started);
        assert_eq!(h.session.state(), PlaybackState::Playing);
        assert_eq!(persisted(&h.store), Some(AzanPlaybackState::new(true, now())));
        assert_eq!(
            *h.events.lock(),
            vec![
                SessionEvent::StateChanged(PlaybackState::Loading),
                SessionEvent::StateChanged(PlaybackState::Playing),
            ]
        );
    }

    #[test]
    fn stop_releases_handle_and_persists_not_playing() {
        let h = harness();
        h.session.start();
        assert!(h.session.stop());

        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert_eq!(h.recorder.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.recorder.live.load(Ordering::SeqCst), 0);
        assert!(!persisted(&h.store).unwrap().is_playing);
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let h = harness();
        assert!(!h.session.stop());
        assert!(persisted(&h.store).is_none());
        assert!(h.events.lock().is_empty());
    }

    #[test]
    fn double_start_keeps_one_handle() {
        let h = harness();
        assert_eq!(h.session.start(), StartOutcome::Started);
        assert_eq!(h.session.start(), StartOutcome::AlreadyActive);
        assert_eq!(h.recorder.plays.load(Ordering::SeqCst), 1);
        assert_eq!(h.recorder.live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_start_while_loading_is_refused() {
        let h = harness();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *h.recorder.entered.lock() = Some(entered_tx);
        *h.recorder.release.lock() = Some(release_rx);

        let session = h.session.clone();
        let first = thread::spawn(move || session.start());

        entered_rx.recv().unwrap();
        assert_eq!(h.session.state(), PlaybackState::Loading);
        assert_eq!(h.session.start(), StartOutcome::AlreadyActive);

        release_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap(), StartOutcome::Started);
        assert_eq!(h.recorder.plays.load(Ordering::SeqCst), 1);
        assert_eq!(h.recorder.live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn natural_end_returns_to_idle() {
        let h = harness();
        h.session.start();
        h.recorder.finish(0);

        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert_eq!(h.recorder.live.load(Ordering::SeqCst), 0);
        assert!(!persisted(&h.store).unwrap().is_playing);
        assert_eq!(
            h.events.lock().last(),
            Some(&SessionEvent::StateChanged(PlaybackState::Idle))
        );

        // Can play again afterwards.
        assert_eq!(h.session.start(), StartOutcome::Started);
    }

    #[test]
    fn end_of_stream_while_loading_finishes_as_idle() {
        let h = harness();
        h.recorder.end_during_play.store(true, Ordering::SeqCst);

        assert_eq!(h.session.start(), StartOutcome::Started);
        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert_eq!(h.recorder.live.load(Ordering::SeqCst), 0);
        assert_eq!(persisted(&h.store), Some(AzanPlaybackState::new(false, now())));
        assert_eq!(
            *h.events.lock(),
            vec![
                SessionEvent::StateChanged(PlaybackState::Loading),
                SessionEvent::StateChanged(PlaybackState::Idle),
            ]
        );

        // The session is usable again right away.
        h.recorder.end_during_play.store(false, Ordering::SeqCst);
        assert_eq!(h.session.start(), StartOutcome::Started);
        assert_eq!(h.session.state(), PlaybackState::Playing);
    }

    #[test]
    fn completion_from_an_old_playback_is_ignored() {
        let h = harness();
        h.session.start();
        h.session.stop();
        h.session.start();

        h.recorder.finish(0);
        assert_eq!(h.session.state(), PlaybackState::Playing);
        assert_eq!(h.recorder.live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disabled_preference_refuses_with_notice() {
        let h = harness();
        h.prefs.azan.store(false, Ordering::SeqCst);

        assert_eq!(h.session.start(), StartOutcome::Disabled);
        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert_eq!(h.recorder.plays.load(Ordering::SeqCst), 0);
        assert_eq!(notices(&h).len(), 1);

        // Read at call time, not cached.
        h.prefs.azan.store(true, Ordering::SeqCst);
        assert_eq!(h.session.start(), StartOutcome::Started);
    }

    #[test]
    fn backend_failure_surfaces_notice_and_resets() {
        let h = harness();
        h.recorder.fail.store(true, Ordering::SeqCst);

        assert_eq!(h.session.start(), StartOutcome::Failed);
        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert!(persisted(&h.store).is_none());
        assert!(notices(&h)[0].contains("no output device"));

        h.recorder.fail.store(false, Ordering::SeqCst);
        assert_eq!(h.session.start(), StartOutcome::Started);
    }

    #[test]
    fn stop_during_loading_cancels_the_start() {
        let h = harness();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *h.recorder.entered.lock() = Some(entered_tx);
        *h.recorder.release.lock() = Some(release_rx);

        let session = h.session.clone();
        let first = thread::spawn(move || session.start());
        entered_rx.recv().unwrap();

        assert!(h.session.stop());
        release_tx.send(()).unwrap();

        assert_eq!(first.join().unwrap(), StartOutcome::Cancelled);
        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert_eq!(h.recorder.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn recent_playing_state_is_resumed() {
        let h = harness_with(saved_at(true, 1));
        assert_eq!(h.session.state(), PlaybackState::Playing);
        assert_eq!(h.session.start(), StartOutcome::AlreadyActive);

        // An explicit stop reconciles the phantom state.
        assert!(h.session.stop());
        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert!(!persisted(&h.store).unwrap().is_playing);
        assert_eq!(h.recorder.stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stale_playing_state_is_discarded() {
        let h = harness_with(saved_at(true, 10));
        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert!(persisted(&h.store).is_none());
    }

    #[test]
    fn unreadable_state_is_discarded() {
        let h = harness_with(MemoryStore::with(PLAYBACK_STATE_KEY, "{not json"));
        assert_eq!(h.session.state(), PlaybackState::Idle);
        assert!(h.store.get(PLAYBACK_STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn storage_failure_does_not_block_transitions() {
        let h = harness();
        h.store.set_failing(true);
        assert_eq!(h.session.start(), StartOutcome::Started);
        assert!(h.session.stop());
        assert_eq!(h.session.state(), PlaybackState::Idle);
    }

    #[test]
    fn unsubscribed_observers_stop_receiving() {
        let h = harness();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = h.session.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        h.session.start();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(h.session.unsubscribe(id));
        assert!(!h.session.unsubscribe(id));
        h.session.stop();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observers_may_call_back_into_the_session() {
        let h = harness();
        let session = h.session.clone();
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        h.session.subscribe(move |_| sink.lock().push(session.state()));

        h.session.start();
        assert_eq!(*states.lock(), vec![PlaybackState::Loading, PlaybackState::Playing]);
    }
}
