//! liftlog - a keyboard-driven workout log for the terminal.
//!
//! Tracks workouts, exercises and sets against a PocketBase backend, with
//! a local query cache so screens open instantly and set edits that show
//! up before the server confirms them.

mod app;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liftlog_core::config::Config;
use liftlog_core::models::{ExerciseSet, Workout, WorkoutExercise, WorkoutStatus};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log files are `liftlog.log.YYYY-MM-DD` in the cache directory
const LOG_FILE_PREFIX: &str = "liftlog.log";

const USAGE: &str = "\
Usage: liftlog [OPTION]

Options:
  --login     Log in from the command line, then start the app
  --export    Print all your workouts as JSON and exit
  --help      Show this message";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a daily file. The returned
/// guard flushes it on drop and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = Config::base_cache_dir()
        .and_then(|dir| std::fs::create_dir_all(&dir).map(|_| dir).map_err(Into::into));

    match log_dir {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::sink))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    info!("liftlog starting");

    let mut app = App::new()?;

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => {}
        Some("--login") => app.login_interactive().await?,
        Some("--export") => return export_workouts(&app).await,
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            return Ok(());
        }
        Some(other) => {
            eprintln!("Unknown option: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Check if we need to login
    if app.is_authenticated() {
        app.startup();
    } else {
        app.start_login();
    }

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if app.has_unsaved_changes() {
        warn!("Exiting with unsaved set changes");
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("liftlog shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Some terminals also report releases
                if key.kind == KeyEventKind::Press {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    // Handle input
                    if handle_input(app, key).await? {
                        return Ok(());
                    }
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();
        app.notifications.prune();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// Export
// ============================================================================

#[derive(Serialize)]
struct ExportedExercise {
    name: String,
    muscle_group: String,
    sets: Vec<ExerciseSet>,
}

#[derive(Serialize)]
struct ExportedWorkout {
    id: String,
    date: String,
    status: WorkoutStatus,
    notes: String,
    exercises: Vec<ExportedExercise>,
}

/// Group logged exercises under their workouts, keeping the workouts' order
fn build_export(workouts: Vec<Workout>, rows: &[WorkoutExercise]) -> Vec<ExportedWorkout> {
    workouts
        .into_iter()
        .map(|workout| {
            let exercises = rows
                .iter()
                .filter(|r| r.workout_id == workout.id)
                .map(|r| ExportedExercise {
                    name: r.exercise_name().to_string(),
                    muscle_group: r.exercise().map_or("Unknown", |e| e.group_label()).to_string(),
                    sets: r.sets.clone(),
                })
                .collect();
            ExportedWorkout {
                status: workout.status,
                id: workout.id,
                date: workout.date,
                notes: workout.notes,
                exercises,
            }
        })
        .collect()
}

/// Print every workout of the logged-in user as JSON on stdout
async fn export_workouts(app: &App) -> Result<()> {
    let user_id = app
        .session
        .user_id()
        .filter(|_| app.is_authenticated())
        .context("Not logged in. Run `liftlog --login` first.")?;

    eprintln!("Fetching workouts from {}...", app.api.base_url());
    let (workouts, rows) = futures::try_join!(
        app.api.fetch_workouts(user_id),
        app.api.fetch_user_workout_exercises(user_id)
    )?;

    let export = build_export(workouts, &rows);
    println!("{}", serde_json::to_string_pretty(&export)?);

    eprintln!("Done! {} workouts with {} exercises exported.", export.len(), rows.len());
    Ok(())
}
