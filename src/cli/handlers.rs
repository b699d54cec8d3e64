use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate};
use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::{self, AzanSession, PlaybackState, SessionEvent, StartOutcome};
use crate::cli::args::{AzanCommands, Toggle};
use crate::config::{AppConfig, Preferences, StoredPreferences};
use crate::db::repository::{CacheRepo, MetaRepo};
use crate::db::{KeyValueStore, MetaStore, SharedConn};
use crate::notifications::{self, desktop, DbNotifier, ScheduleReport};
use crate::prayer_times::provider::{method_id, CALC_METHODS};
use crate::prayer_times::{countdown, next_prayer_at, PrayerTimesService};
use crate::utils::format::{format_duration_secs, format_remaining, format_time};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

/// Retry delay for the daemon when today's timings cannot be loaded.
const DAEMON_RETRY: Duration = Duration::from_secs(60);

/// Key-value store and preferences over the shared connection.
pub fn open_stores(conn: &SharedConn) -> (Arc<dyn KeyValueStore>, Arc<StoredPreferences>) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MetaStore::new(Arc::clone(conn)));
    let prefs = Arc::new(StoredPreferences::new(Arc::clone(&store)));
    (store, prefs)
}

// ─── Setup ───────────────────────────────────────────────────────────────────

pub fn handle_setup(
    conn: &SharedConn,
    config: &mut AppConfig,
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    method: Option<String>,
) -> Result<()> {
    let interactive = name.is_none() || latitude.is_none() || longitude.is_none();
    if interactive {
        println!();
        println_colored!(GOLD, "  miqat setup");
        println_colored!(DIM, "  Press Enter to keep the value in brackets.");
        println!();
    }

    let name = match name {
        Some(n) => n,
        None => prompt_or(&format!("  Location name [{}]: ", config.location.name), &config.location.name)?,
    };
    let latitude = match latitude {
        Some(v) => v,
        None => prompt_or(&format!("  Latitude [{}]: ", config.location.latitude), &config.location.latitude.to_string())?
            .parse()
            .map_err(|_| anyhow!("Latitude must be a number"))?,
    };
    let longitude = match longitude {
        Some(v) => v,
        None => prompt_or(&format!("  Longitude [{}]: ", config.location.longitude), &config.location.longitude.to_string())?
            .parse()
            .map_err(|_| anyhow!("Longitude must be a number"))?,
    };
    let method = match method {
        Some(m) => m,
        None if interactive => prompt_or(
            &format!("  Method ({}) [{}]: ", CALC_METHODS.join(", "), config.location.calc_method),
            &config.location.calc_method,
        )?,
        None => config.location.calc_method.clone(),
    };

    if !(-90.0..=90.0).contains(&latitude) {
        bail!("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        bail!("Longitude must be between -180 and 180");
    }
    if method_id(&method).is_none() {
        bail!(
            "Unknown calculation method '{}'. Use one of: {}",
            method,
            CALC_METHODS.join(", ")
        );
    }

    let moved = config.location.latitude != latitude
        || config.location.longitude != longitude
        || config.location.calc_method != method;

    config.location.name = name;
    config.location.latitude = latitude;
    config.location.longitude = longitude;
    config.location.calc_method = method;
    config.save()?;

    {
        let conn = conn.lock();
        if moved {
            CacheRepo::clear_all(&conn)?;
            log::info!("location changed, cleared cached timings");
        }
        MetaRepo::set(&conn, "setup_done", "1")?;
    }

    println_colored!(
        GREEN,
        "  ✓ Saved {} ({:.4}, {:.4}) using {}",
        config.location.name,
        config.location.latitude,
        config.location.longitude,
        config.location.calc_method
    );

    let (_, prefs) = open_stores(conn);
    match notifications::schedule_today(conn, config, prefs, Local::now().naive_local()) {
        Ok((_, report)) => print_report(&report),
        Err(e) => {
            log::warn!("scheduling after setup: {:#}", e);
            println_colored!(AMBER, "  Could not schedule reminders yet: {:#}", e);
        }
    }
    Ok(())
}

// ─── Times ───────────────────────────────────────────────────────────────────

pub fn handle_times(conn: &SharedConn, config: &AppConfig, json: bool) -> Result<()> {
    let now = Local::now().naive_local();
    let service = PrayerTimesService::from_config(config)?;
    let timings = service.get_cached_or_fetch(conn, now.date())?;
    let tick = countdown::countdown(&timings, now);
    let (_, due_at) = next_prayer_at(&timings, now);

    if json {
        let out = serde_json::json!({
            "date": now.date().format("%Y-%m-%d").to_string(),
            "location": config.location.name,
            "timings": timings,
            "next": tick.prayer,
            "remaining": tick.remaining,
            "remaining_secs": tick.remaining.total_secs(),
            "next_at": due_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println_colored!(
        GOLD,
        "  Prayer Times — {} ({})",
        config.location.name,
        now.date().format("%Y-%m-%d")
    );
    println!();

    for (prayer, time) in timings.iter() {
        let line = format!("  {:<10}  {}", prayer.display_name(), format_time(time));
        if prayer == tick.prayer {
            println_colored!(AMBER, "{}  ◀", line);
        } else if time <= now.time() {
            println_colored!(DIM, "{}", line);
        } else {
            println_colored!(BOLD, "{}", line);
        }
    }

    println!();
    let when = if due_at.date() == now.date() { "today" } else { "tomorrow" };
    println_colored!(
        AMBER,
        "  Next: {} {} at {} (in {})",
        tick.prayer.display_name(),
        when,
        format_time(due_at.time()),
        format_remaining(&tick.remaining)
    );
    println!();
    Ok(())
}

// ─── Reminders ───────────────────────────────────────────────────────────────

pub fn handle_schedule(conn: &SharedConn, config: &AppConfig) -> Result<()> {
    let (_, prefs) = open_stores(conn);
    if !prefs.notifications_enabled() {
        println_colored!(DIM, "  Reminders are turned off (miqat prefs --notifications on)");
    }
    let (_, report) =
        notifications::schedule_today(conn, config, prefs, Local::now().naive_local())?;
    print_report(&report);
    Ok(())
}

pub fn handle_reminders(conn: &SharedConn) -> Result<()> {
    let pending = DbNotifier::new(Arc::clone(conn)).pending()?;
    let now = Local::now().naive_local();

    println!();
    if pending.is_empty() {
        println_colored!(DIM, "  No pending reminders. Run `miqat schedule`.");
    } else {
        println_colored!(GOLD, "  Pending reminders ({})", pending.len());
        println!();
        for n in &pending {
            let secs = (n.trigger - now).num_seconds().max(0) as u64;
            println!(
                "  {:<10}  {}  {}",
                n.payload.display_name(),
                n.trigger.format("%a %H:%M"),
                format!("{}in {}\x1b[0m", DIM, format_duration_secs(secs))
            );
        }
    }
    println!();
    Ok(())
}

fn print_report(report: &ScheduleReport) {
    if !report.scheduled.is_empty() {
        let names: Vec<&str> = report.scheduled.iter().map(|p| p.display_name()).collect();
        println_colored!(GREEN, "  ✓ Scheduled: {}", names.join(", "));
    }
    if !report.skipped.is_empty() {
        let names: Vec<&str> = report.skipped.iter().map(|p| p.display_name()).collect();
        println_colored!(DIM, "  Skipped (too soon): {}", names.join(", "));
    }
    if !report.failed.is_empty() {
        let names: Vec<&str> = report.failed.iter().map(|p| p.display_name()).collect();
        println_colored!(RED, "  ✗ Failed: {}", names.join(", "));
    }
}

// ─── Azan ────────────────────────────────────────────────────────────────────

pub fn handle_azan(conn: &SharedConn, config: &AppConfig, action: &AzanCommands) -> Result<()> {
    let (store, prefs) = open_stores(conn);
    let session = audio::session_from_config(config, store, prefs)?;

    match action {
        AzanCommands::Play => play_blocking(&session),
        AzanCommands::Stop => {
            if session.stop() {
                println_colored!(GREEN, "  ■ Azan stopped");
            } else {
                println_colored!(DIM, "  Azan is not playing");
            }
            Ok(())
        }
        AzanCommands::Status => {
            match session.state() {
                PlaybackState::Playing => println_colored!(AMBER, "  ▶ Azan is playing"),
                state => println_colored!(DIM, "  Azan is {}", state.label()),
            }
            Ok(())
        }
    }
}

fn play_blocking(session: &AzanSession) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let id = session.subscribe(move |event| {
        let _ = tx.send(event.clone());
    });

    let outcome = session.start();
    match outcome {
        StartOutcome::Started => {
            println_colored!(AMBER, "  ▶ Playing azan… (Ctrl-C to stop)");
            for event in rx.iter() {
                match event {
                    SessionEvent::StateChanged(PlaybackState::Idle) => break,
                    SessionEvent::Notice(msg) => println_colored!(RED, "  {}", msg),
                    SessionEvent::StateChanged(_) => {}
                }
            }
            println_colored!(GREEN, "  ✓ Azan finished");
        }
        StartOutcome::AlreadyActive => {
            println_colored!(DIM, "  Azan is already playing (miqat azan stop)");
        }
        StartOutcome::Disabled | StartOutcome::Failed | StartOutcome::Cancelled => {
            for event in rx.try_iter() {
                if let SessionEvent::Notice(msg) = event {
                    println_colored!(RED, "  {}", msg);
                }
            }
        }
    }
    session.unsubscribe(id);

    if outcome == StartOutcome::Failed {
        bail!("Azan playback failed");
    }
    Ok(())
}

// ─── Preferences ─────────────────────────────────────────────────────────────

pub fn handle_prefs(
    conn: &SharedConn,
    azan: Option<Toggle>,
    notifications: Option<Toggle>,
) -> Result<()> {
    let (_, prefs) = open_stores(conn);
    if let Some(toggle) = azan {
        prefs.set_azan_enabled(toggle.enabled())?;
    }
    if let Some(toggle) = notifications {
        prefs.set_notifications_enabled(toggle.enabled())?;
    }

    let show = |label: &str, on: bool| {
        if on {
            println_colored!(GREEN, "  {:<15} on", label);
        } else {
            println_colored!(DIM, "  {:<15} off", label);
        }
    };
    println!();
    show("Azan", prefs.azan_enabled());
    show("Notifications", prefs.notifications_enabled());
    println!();
    Ok(())
}

// ─── Daemon ──────────────────────────────────────────────────────────────────

pub fn handle_daemon(conn: &SharedConn, config: &AppConfig) -> Result<()> {
    let (store, prefs) = open_stores(conn);
    let session = audio::session_from_config(config, store, prefs.clone())?;
    session.subscribe(|event| match event {
        SessionEvent::StateChanged(state) => log::info!("azan {}", state.label()),
        SessionEvent::Notice(msg) => log::warn!("{}", msg),
    });
    let notifier = DbNotifier::new(Arc::clone(conn));

    println_colored!(GOLD, "  miqat daemon running for {} (Ctrl-C to exit)", config.location.name);

    let mut scheduled_on: Option<NaiveDate> = None;
    let mut next_attempt = Instant::now();
    // Rows left by an earlier run are not trusted until a schedule succeeds.
    let mut synced = false;
    // How late a reminder may still fire.
    let grace = config.lead_time().max(chrono::Duration::minutes(1));

    loop {
        let now = Local::now().naive_local();

        if scheduled_on != Some(now.date()) && Instant::now() >= next_attempt {
            match notifications::schedule_today(conn, config, prefs.clone(), now) {
                Ok((_, report)) => {
                    log::info!(
                        "scheduled {} reminders ({} skipped, {} failed)",
                        report.scheduled.len(),
                        report.skipped.len(),
                        report.failed.len()
                    );
                    scheduled_on = Some(now.date());
                    synced = true;
                }
                Err(e) => {
                    log::warn!("scheduling reminders: {:#}", e);
                    next_attempt = Instant::now() + DAEMON_RETRY;
                }
            }
        }

        if !synced {
            thread::sleep(Duration::from_secs(1));
            continue;
        }

        match notifier.take_due(now, grace) {
            Ok(due) if !due.is_empty() => {
                for reminder in &due {
                    log::info!("reminder fired: {}", reminder.title);
                    if let Err(e) = desktop::show(reminder) {
                        log::warn!("desktop notification: {:#}", e);
                    }
                    if config.azan.play_on_reminder {
                        notifications::respond(&session, reminder.payload);
                    }
                }
                // Roll the fired prayers over to their next occurrence.
                scheduled_on = None;
            }
            Ok(_) => {}
            Err(e) => log::warn!("reading due reminders: {:#}", e),
        }

        thread::sleep(Duration::from_secs(1));
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf)?;
    Ok(buf.trim_end_matches('\n').trim_end_matches('\r').to_string())
}

fn prompt_or(message: &str, default: &str) -> Result<String> {
    let answer = prompt(message)?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}
