use std::{sync::Arc, time::Duration};

use log::{debug, info};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::detection::DetectionEvent;

use super::{
    state::{format_mmss, SessionConfig, SessionSnapshot, SessionSummary},
    tracker::FocusTracker,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Async host for a [`FocusTracker`].
///
/// The mutex is the serialisation point: detection events and timer polls
/// take turns on the same tracker and never interleave.
#[derive(Clone)]
pub struct TrackerController {
    tracker: Arc<Mutex<FocusTracker>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    poll_interval: Duration,
    heartbeat_every_ticks: u32,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    summaries: Arc<watch::Sender<Option<SessionSummary>>>,
}

impl TrackerController {
    pub fn new(tracker: FocusTracker) -> Self {
        let heartbeat_every_ticks = tracker.settings().heartbeat_every_ticks.max(1);
        let (snapshots, _) = watch::channel(tracker.snapshot());
        let (summaries, _) = watch::channel(None);

        Self {
            tracker: Arc::new(Mutex::new(tracker)),
            ticker: Arc::new(Mutex::new(None)),
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_every_ticks,
            snapshots: Arc::new(snapshots),
            summaries: Arc::new(summaries),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Yields the summary of every session that ends, whichever way it ends.
    pub fn subscribe_summaries(&self) -> watch::Receiver<Option<SessionSummary>> {
        self.summaries.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.tracker.lock().await.snapshot()
    }

    pub async fn start_session(&self, config: &SessionConfig) -> SessionSnapshot {
        let snapshot = self.tracker.lock().await.start(config);
        self.spawn_ticker().await;
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    pub async fn end_session(&self) -> Option<SessionSummary> {
        self.cancel_ticker().await;
        let (summary, snapshot) = {
            let mut tracker = self.tracker.lock().await;
            (tracker.stop(), tracker.snapshot())
        };
        self.snapshots.send_replace(snapshot);
        if let Some(summary) = &summary {
            self.summaries.send_replace(Some(summary.clone()));
        }
        summary
    }

    pub async fn ingest(&self, event: DetectionEvent) {
        let snapshot = {
            let mut tracker = self.tracker.lock().await;
            if !tracker.is_active() {
                return;
            }
            tracker.update_focus_state(&event);
            tracker.snapshot()
        };
        self.snapshots.send_replace(snapshot);
    }

    /// Drains `rx` into the tracker in arrival order. The task ends when every
    /// sender is gone.
    pub fn spawn_ingest(&self, mut rx: mpsc::Receiver<DetectionEvent>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                controller.ingest(event).await;
            }
            debug!("detection queue closed");
        })
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let tracker = self.tracker.clone();
        let snapshots = self.snapshots.clone();
        let summaries = self.summaries.clone();
        let poll_interval = self.poll_interval;
        let heartbeat_every = u64::from(self.heartbeat_every_ticks);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let (report, snapshot) = {
                    let mut guard = tracker.lock().await;
                    if !guard.is_active() {
                        break;
                    }
                    let report = guard.run_due_timers();
                    (report, guard.snapshot())
                };

                if report.ticks == 0 && report.hydration_reminders == 0 {
                    continue;
                }

                snapshots.send_replace(snapshot.clone());

                if let Some(summary) = report.completed {
                    summaries.send_replace(Some(summary));
                    break;
                }

                let elapsed = snapshot.session_duration;
                let previous = elapsed.saturating_sub(u64::from(report.ticks));
                if report.ticks > 0 && elapsed / heartbeat_every != previous / heartbeat_every {
                    info!(
                        "heartbeat: elapsed {} remaining {} score {:.0}% ({:?})",
                        format_mmss(elapsed),
                        snapshot.remaining_display(),
                        snapshot.focus_score,
                        snapshot.classification
                    );
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
