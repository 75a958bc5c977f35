pub mod clock;
pub mod detection;
pub mod notify;
pub mod scheduler;
pub mod session;
pub mod settings;

use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use log::{info, warn};
use tokio::sync::mpsc;

use clock::SystemClock;
use detection::{DetectionController, SourceKind};
use notify::LogNotifier;
use session::{FocusTracker, TrackerController};
use settings::{SettingsStore, TrackerSettings};

pub use detection::DetectionEvent;
pub use session::{SessionConfig, SessionSnapshot, SessionSummary, SessionType};

const DETECTION_QUEUE_DEPTH: usize = 64;
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn load_settings() -> Result<TrackerSettings> {
    match std::env::var_os("FACEFOCUS_SETTINGS") {
        Some(path) => Ok(SettingsStore::new(PathBuf::from(path))?.tracker()),
        None => Ok(TrackerSettings::default()),
    }
}

/// Headless entry point: reads detection events from the configured source,
/// tracks one session and logs its summary.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("FaceFocus starting up...");

    run_on_runtime(run_session())?
}

/// Drives `future` on a fresh runtime, then shuts the runtime down without
/// waiting on blocking reads (stdin) that are still parked.
fn run_on_runtime<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    Ok(output)
}

async fn run_session() -> Result<()> {
    let mut settings = load_settings()?;
    if env_flag("FACEFOCUS_DEBUG") {
        settings.heartbeat_every_ticks = 1;
    }

    let session_input = std::env::var("FACEFOCUS_SESSION").unwrap_or_else(|_| "pomodoro".into());
    let config = session::select(&session_input)?;

    let source = match std::env::var("FACEFOCUS_SOURCE") {
        Ok(raw) => SourceKind::parse(&raw).ok_or_else(|| anyhow!("unknown detection source {raw:?}"))?,
        Err(_) => SourceKind::Stdin,
    };

    let tracker = FocusTracker::with_settings(Arc::new(SystemClock), Arc::new(LogNotifier), settings);
    let controller = TrackerController::new(tracker);
    let mut summaries = controller.subscribe_summaries();

    let (tx, rx) = mpsc::channel(DETECTION_QUEUE_DEPTH);
    let mut detection = DetectionController::new();

    controller.start_session(&config).await;
    let mut ingest = controller.spawn_ingest(rx);
    detection.start(source, tx)?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; ending session");
        }
        _ = summaries.changed() => {
            info!("session finished");
        }
        _ = &mut ingest => {
            warn!("detection source ended before the session did");
        }
    }

    detection.stop().await?;
    ingest.abort();

    let summary = match controller.end_session().await {
        Some(summary) => Some(summary),
        None => summaries.borrow().clone(),
    };
    if let Some(summary) = summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
