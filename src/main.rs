mod audio;
mod cli;
mod config;
mod db;
mod models;
mod notifications;
mod prayer_times;
mod tui;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::migrations::run_migrations;
use db::repository::MetaRepo;
use db::SharedConn;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Loading config")?;

    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;

    // WAL lets the daemon and the dashboard share the file.
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&conn)?;
    let conn = db::store::share(conn);

    match cli.command {
        Some(Commands::Setup {
            name,
            latitude,
            longitude,
            method,
        }) => {
            handlers::handle_setup(&conn, &mut config, name, latitude, longitude, method)?;
        }

        Some(cmd) => {
            ensure_setup(&conn, &mut config)?;
            match cmd {
                Commands::Times { json } => handlers::handle_times(&conn, &config, json)?,
                Commands::Schedule => handlers::handle_schedule(&conn, &config)?,
                Commands::Reminders => handlers::handle_reminders(&conn)?,
                Commands::Azan { action } => handlers::handle_azan(&conn, &config, &action)?,
                Commands::Prefs {
                    azan,
                    notifications,
                } => handlers::handle_prefs(&conn, azan, notifications)?,
                Commands::Daemon => handlers::handle_daemon(&conn, &config)?,
                Commands::Setup { .. } => unreachable!(),
            }
        }

        None => {
            ensure_setup(&conn, &mut config)?;
            tui::app::run(conn, config)?;
        }
    }

    Ok(())
}

/// Run the setup prompts once before anything needs a location.
fn ensure_setup(conn: &SharedConn, config: &mut AppConfig) -> Result<()> {
    let done = MetaRepo::get(&conn.lock(), "setup_done")?;
    if done.as_deref() != Some("1") {
        eprintln!("No configuration found. Running setup...");
        eprintln!();
        handlers::handle_setup(conn, config, None, None, None, None)?;
    }
    Ok(())
}
