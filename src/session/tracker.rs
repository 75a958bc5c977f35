use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::detection::DetectionEvent;
use crate::notify::{
    Notifier, AWAY_BODY, AWAY_TITLE, COMPLETE_BODY, COMPLETE_TITLE, HYDRATION_BODY,
    HYDRATION_TITLE,
};
use crate::scheduler::{CatchUp, Scheduler, TimerKind};
use crate::settings::TrackerSettings;

use super::state::{
    Classification, SessionConfig, SessionSnapshot, SessionState, SessionSummary,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No session was running; nothing changed.
    Inactive,
    Running { elapsed_secs: u64, remaining_secs: u64 },
    /// The countdown hit zero on this tick and the session was stopped.
    Completed(SessionSummary),
}

/// What a pass over the scheduler did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DueReport {
    pub ticks: u32,
    pub hydration_reminders: u32,
    pub completed: Option<SessionSummary>,
}

/// Turns detection events and timer firings into per-label time totals.
///
/// Single owner, synchronous. Hosts with real concurrency must serialise
/// calls (see `TrackerController`).
pub struct FocusTracker {
    state: SessionState,
    settings: TrackerSettings,
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl FocusTracker {
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_settings(clock, notifier, TrackerSettings::default())
    }

    pub fn with_settings(
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            state: SessionState::new(),
            settings: settings.sanitized(),
            scheduler: Scheduler::new(),
            clock,
            notifier,
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn classification(&self) -> Classification {
        self.state.classification
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&self.state)
    }

    pub fn focus_score(&self) -> f64 {
        self.state.focus_score()
    }

    /// Earliest instant at which `run_due_timers` has work to do.
    pub fn next_timer_due(&self) -> Option<Instant> {
        [TimerKind::Tick, TimerKind::Hydration]
            .into_iter()
            .filter_map(|kind| self.scheduler.next_due(kind))
            .min()
    }

    /// Starts a fresh session. Starting while active discards the running
    /// session without a summary.
    pub fn start(&mut self, config: &SessionConfig) -> SessionSnapshot {
        let now = self.clock.now();

        if let (true, Some(previous)) = (self.state.active, self.state.session_id.as_deref()) {
            info!("Restarting: discarding active session {}", previous);
        }

        self.scheduler.cancel_all();

        let session_id = Uuid::new_v4().to_string();
        self.state
            .begin_session(session_id.clone(), config, self.clock.wall_now(), now);

        self.scheduler
            .arm(TimerKind::Tick, TICK_PERIOD, now, CatchUp::Replay);
        self.scheduler.arm(
            TimerKind::Hydration,
            self.settings.hydration_interval(),
            now,
            CatchUp::Coalesce,
        );

        info!(
            "Started {} session {} (target {}s)",
            config.session_type, session_id, config.duration_secs
        );

        self.snapshot()
    }

    /// Folds one detection event into the totals. Elapsed time since the
    /// previous update goes to the label held *before* this event.
    pub fn update_focus_state(&mut self, event: &DetectionEvent) {
        if !self.state.active {
            return;
        }
        let Some(last_update) = self.state.last_update else {
            return;
        };

        let now = self.clock.now();
        let next = event.classify(self.settings.focus_threshold);
        let delta = now.saturating_duration_since(last_update).as_secs_f64();

        self.state.credit(self.state.classification, delta);

        if next == Classification::Away {
            self.check_away(now);
        } else if self.state.away.started_at.is_some() {
            debug!("Away period closed after {:?}", self.state.away.away_for(now));
            self.state.away.clear();
        }

        if next != self.state.classification {
            debug!("{:?} -> {:?}", self.state.classification, next);
        }
        self.state.classification = next;
        self.state.last_update = Some(now);
    }

    fn check_away(&mut self, now: Instant) {
        let guard = &mut self.state.away;
        match guard.started_at {
            None => {
                guard.started_at = Some(now);
                debug!("Away period opened");
            }
            Some(started) => {
                let away_for = now.saturating_duration_since(started);
                if away_for >= self.settings.away_notify_after() && !guard.notified {
                    guard.notified = true;
                    info!("Away for {:.1}s; sending reminder", away_for.as_secs_f64());
                    self.notifier.notify(AWAY_TITLE, AWAY_BODY);
                }
            }
        }
    }

    /// One second of session time. Gaps between detection events are
    /// credited to the held label here.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.active {
            return TickOutcome::Inactive;
        }

        let now = self.clock.now();
        self.state.settle(now);
        self.state.elapsed_secs += 1;

        if self.state.is_timed() {
            self.state.remaining_secs = self.state.remaining_secs.saturating_sub(1);
            if self.state.remaining_secs == 0 {
                info!("Countdown finished for session {:?}", self.state.session_id);
                self.notifier.notify(COMPLETE_TITLE, COMPLETE_BODY);
                return match self.finish(true) {
                    Some(summary) => TickOutcome::Completed(summary),
                    None => TickOutcome::Inactive,
                };
            }
        }

        TickOutcome::Running {
            elapsed_secs: self.state.elapsed_secs,
            remaining_secs: self.state.remaining_secs,
        }
    }

    /// Ends the session and cancels its timers. `None` if nothing was running.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        self.finish(false)
    }

    fn finish(&mut self, completed: bool) -> Option<SessionSummary> {
        if !self.state.active {
            return None;
        }

        self.state.settle(self.clock.now());
        self.scheduler.cancel_all();
        self.state.finish();

        let summary = SessionSummary::from_state(&self.state, completed);
        info!("{}", summary.describe());
        Some(summary)
    }

    /// Runs every timer that came due on the clock. Missed ticks are replayed;
    /// a late hydration reminder fires once.
    pub fn run_due_timers(&mut self) -> DueReport {
        let mut report = DueReport::default();
        if !self.state.active {
            return report;
        }

        let now = self.clock.now();
        for kind in self.scheduler.take_due(now) {
            match kind {
                TimerKind::Tick => {
                    report.ticks += 1;
                    if let TickOutcome::Completed(summary) = self.tick() {
                        report.completed = Some(summary);
                        break;
                    }
                }
                TimerKind::Hydration => {
                    report.hydration_reminders += 1;
                    info!("Hydration reminder");
                    self.notifier.notify(HYDRATION_TITLE, HYDRATION_BODY);
                }
            }
        }

        report
    }
}
