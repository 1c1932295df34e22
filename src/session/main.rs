/**
 * LiftLog Session Demo
 *
 * Runs one scripted workout through the session core against the configured
 * server: start, background/foreground, lose the network, finish offline,
 * reconnect and let the background sync deliver the queued workout.
 *
 * Usage: liftlog-session [config.toml]
 */
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use liftlog_session::session::{FinishOutcome, HttpWorkoutWriter, SessionController, StartKind, Visibility};
use liftlog_session::shared::{ExerciseLog, SessionConfig, SetLog};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config file");
            SessionConfig::load(&path)?
        }
        None => SessionConfig::from_env()?,
    };
    tracing::info!(server = %config.server_url, data_dir = %config.data_dir.display(), "Session core starting");

    let writer = Arc::new(HttpWorkoutWriter::new(&config)?);
    let mut controller = SessionController::open(config, writer)?;

    if controller.queue_count() > 0 {
        println!("{} workout(s) restored from a previous run", controller.queue_count());
    }
    controller.start_background_sync();

    match controller.start_workout("Demo session", None) {
        StartKind::Resumed { accumulated_seconds } => {
            println!("Resumed a running session at {accumulated_seconds}s")
        }
        StartKind::Fresh | StartKind::AlreadyRunning => println!("Started a new session"),
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    controller.on_visibility_change(Visibility::Hidden);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let elapsed = controller.on_visibility_change(Visibility::Visible);
    println!("Back in the foreground at {elapsed}s ({})", controller.format_elapsed());

    controller.set_online(false);
    println!("Network lost");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let exercises = vec![
        ExerciseLog::new("Squat", vec![SetLog::new(5, Some(100.0)), SetLog::new(5, Some(100.0))]),
        ExerciseLog::new("Plank", vec![SetLog::new(1, None)]),
    ];
    match controller.finish_workout(exercises, Some("demo run".to_string())).await? {
        FinishOutcome::Saved(m) => println!("Workout {} saved", m.id),
        FinishOutcome::Queued(m) => println!("Workout {} queued ({} pending)", m.id, controller.queue_count()),
    }

    controller.set_online(true);
    println!("Network restored (just reconnected: {})", controller.just_reconnected());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while controller.queue_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    match controller.queue_count() {
        0 => println!("Offline queue delivered"),
        n => println!("{n} workout(s) still queued; they will be retried on the next run"),
    }

    controller.stop_background_sync();
    Ok(())
}
