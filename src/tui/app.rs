use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    widgets::Block,
    Frame,
};
use std::sync::{mpsc, Arc};

use crate::audio::{self, AzanSession, PlaybackState, SessionEvent, StartOutcome};
use crate::cli::handlers::open_stores;
use crate::config::{AppConfig, Preferences, StoredPreferences};
use crate::db::SharedConn;
use crate::models::{PrayerTimings, PrayerType};
use crate::notifications::{self, DbNotifier};
use crate::prayer_times::countdown::{local_clock, TICK_PERIOD};
use crate::prayer_times::{countdown, CountdownTick, CountdownTimer, PrayerTimesService};
use crate::tui::events::{Event, EventHandler};
use crate::tui::theme;
use crate::tui::widgets::{azan, header, next_prayer, prayers, statusbar};

pub struct App {
    pub config: AppConfig,
    pub should_quit: bool,

    conn: SharedConn,
    prefs: Arc<StoredPreferences>,
    session: AzanSession,
    events: mpsc::Sender<Event>,
    timer: Option<CountdownTimer>,
    /// Whether this process started the current playback.
    started_here: bool,

    // Cached state (refreshed on tick/action)
    pub today: NaiveDate,
    pub timings: Option<PrayerTimings>,
    pub countdown: Option<CountdownTick>,
    pub reminders: Vec<PrayerType>,
    pub azan_state: PlaybackState,
    pub azan_enabled: bool,
    pub notice: Option<String>,
    pub status: Option<String>,
}

impl App {
    pub fn new(
        config: AppConfig,
        conn: SharedConn,
        prefs: Arc<StoredPreferences>,
        session: AzanSession,
        events: mpsc::Sender<Event>,
    ) -> Self {
        let azan_state = session.state();
        App {
            config,
            should_quit: false,
            conn,
            prefs,
            session,
            events,
            timer: None,
            started_here: false,
            today: Local::now().date_naive(),
            timings: None,
            countdown: None,
            reminders: Vec::new(),
            azan_state,
            azan_enabled: true,
            notice: None,
            status: None,
        }
    }

    /// Load today's timings from the cache (fetching on a miss) and restart
    /// the countdown.
    pub fn load(&mut self) {
        self.today = Local::now().date_naive();
        let loaded = PrayerTimesService::from_config(&self.config)
            .and_then(|service| service.get_cached_or_fetch(&self.conn, self.today));
        match loaded {
            Ok(timings) => self.set_timings(timings),
            Err(e) => {
                log::warn!("loading prayer times: {:#}", e);
                self.status = Some(format!("Could not load prayer times: {}", e));
            }
        }
        self.load_reminders();
        self.azan_enabled = self.prefs.azan_enabled();
    }

    fn set_timings(&mut self, timings: PrayerTimings) {
        self.countdown = Some(countdown(&timings, Local::now().naive_local()));
        // Dropping the old timer joins its thread before the new one starts.
        self.timer = None;
        let tx = self.events.clone();
        match CountdownTimer::spawn(timings.clone(), local_clock(), TICK_PERIOD, move |tick| {
            tx.send(Event::Countdown(tick)).is_ok()
        }) {
            Ok(timer) => self.timer = Some(timer),
            Err(e) => log::warn!("starting countdown: {:#}", e),
        }
        self.timings = Some(timings);
    }

    fn load_reminders(&mut self) {
        match DbNotifier::new(Arc::clone(&self.conn)).pending() {
            Ok(pending) => self.reminders = pending.iter().map(|n| n.payload).collect(),
            Err(e) => log::warn!("reading reminders: {:#}", e),
        }
    }

    /// Refetch today's timings and replace pending reminders.
    fn refresh(&mut self) {
        let now = Local::now().naive_local();
        self.today = now.date();
        let refreshed = PrayerTimesService::from_config(&self.config)
            .and_then(|service| service.refresh(&self.conn, self.today));
        match refreshed {
            Ok(timings) => self.set_timings(timings),
            Err(e) => {
                log::warn!("refreshing prayer times: {:#}", e);
                self.status = Some(format!("Refresh failed: {}", e));
                return;
            }
        }

        let prefs: Arc<dyn Preferences> = self.prefs.clone();
        self.status = match notifications::schedule_today(&self.conn, &self.config, prefs, now) {
            Ok((_, report)) if !report.failed.is_empty() => Some(format!(
                "Refreshed · {} reminders, {} failed",
                report.scheduled.len(),
                report.failed.len()
            )),
            Ok((_, report)) => Some(format!("Refreshed · {} reminders", report.scheduled.len())),
            Err(e) => {
                log::warn!("scheduling reminders: {:#}", e);
                Some(format!("Scheduling failed: {}", e))
            }
        };
        self.load_reminders();
    }

    pub fn tick(&mut self) {
        if Local::now().date_naive() != self.today {
            self.load();
        }
        self.azan_enabled = self.prefs.azan_enabled();
    }

    pub fn on_session(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StateChanged(state) => {
                self.azan_state = state;
                if state == PlaybackState::Idle {
                    self.started_here = false;
                }
            }
            SessionEvent::Notice(msg) => self.notice = Some(msg),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Some terminals also report release and repeat events
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('p') => {
                self.notice = None;
                if self.session.start() == StartOutcome::Started {
                    self.started_here = true;
                }
            }
            KeyCode::Char('s') => {
                if !self.session.stop() {
                    self.status = Some("Azan is not playing".to_string());
                }
            }
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
    }

    /// Stop playback this dashboard started; audio owned by another process
    /// is left alone.
    pub fn shutdown(&mut self) {
        self.timer = None;
        if self.started_here && self.session.state() != PlaybackState::Idle {
            self.session.stop();
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        // Clear background
        frame.render_widget(Block::default().style(theme::screen()), area);

        let outer_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // header
                Constraint::Min(0),    // body
                Constraint::Length(1), // status bar
            ])
            .split(area);

        header::render(
            frame,
            outer_chunks[0],
            &self.config.location.name,
            &self.config.location.calc_method,
        );
        statusbar::render(frame, outer_chunks[2], self.status.as_deref());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(outer_chunks[1]);

        let left_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(columns[0]);

        prayers::render(
            frame,
            left_chunks[0],
            self.timings.as_ref(),
            self.countdown.map(|tick| tick.prayer),
            &self.reminders,
            Local::now().time(),
        );

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7), // next prayer
                Constraint::Min(0),    // azan
            ])
            .split(columns[1]);

        next_prayer::render(frame, right_chunks[0], self.countdown.as_ref());
        azan::render(
            frame,
            right_chunks[1],
            self.azan_state,
            self.azan_enabled,
            self.notice.as_deref(),
        );
    }
}

/// Run the TUI event loop.
pub fn run(conn: SharedConn, config: AppConfig) -> Result<()> {
    let (store, prefs) = open_stores(&conn);
    let session = audio::session_from_config(&config, store, prefs.clone())?;

    let events = EventHandler::new(500);
    let session_tx = events.sender();
    let subscription = session.subscribe(move |event| {
        let _ = session_tx.send(Event::Session(event.clone()));
    });

    let mut app = App::new(config, conn, prefs, session.clone(), events.sender());
    app.load();

    let mut terminal = ratatui::init();

    loop {
        terminal.draw(|frame| app.draw(frame))?;

        match events.next()? {
            Event::Key(key) => {
                app.handle_key(key);
                if app.should_quit {
                    break;
                }
            }
            Event::Tick => app.tick(),
            Event::Countdown(tick) => app.countdown = Some(tick),
            Event::Session(event) => app.on_session(event),
        }
    }

    ratatui::restore();
    app.shutdown();
    session.unsubscribe(subscription);
    Ok(())
}
