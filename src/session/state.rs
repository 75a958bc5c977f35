use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

pub const POMODORO_SECS: u64 = 25 * 60;
pub const DEEP_WORK_SECS: u64 = 90 * 60;
pub const SHORT_SPRINT_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    Pomodoro,
    DeepWork,
    ShortSprint,
    Custom,
}

impl SessionType {
    /// Fixed length for presets; `Custom` has none.
    pub const fn preset_duration_secs(&self) -> Option<u64> {
        match self {
            Self::Pomodoro => Some(POMODORO_SECS),
            Self::DeepWork => Some(DEEP_WORK_SECS),
            Self::ShortSprint => Some(SHORT_SPRINT_SECS),
            Self::Custom => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pomodoro" | "pomo" => Some(Self::Pomodoro),
            "deep-work" | "deepwork" | "deep" => Some(Self::DeepWork),
            "short-sprint" | "shortsprint" | "sprint" => Some(Self::ShortSprint),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Pomodoro => "Pomodoro",
            Self::DeepWork => "Deep Work",
            Self::ShortSprint => "Short Sprint",
            Self::Custom => "Custom",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Validated input to `FocusTracker::start`. A zero duration means untimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub session_type: SessionType,
    pub duration_secs: u64,
    pub name: String,
}

/// Presence label for an instant of the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    Focused,
    Distracted,
    #[default]
    Away,
}

/// Debounce window for the "come back" reminder. One per uninterrupted away
/// period.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwayGuard {
    pub started_at: Option<Instant>,
    pub notified: bool,
}

impl AwayGuard {
    pub fn away_for(&self, now: Instant) -> Option<Duration> {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub active: bool,
    pub session_id: Option<String>,
    pub session_type: Option<SessionType>,
    pub session_name: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub target_duration_secs: u64,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub focused_secs: f64,
    pub distracted_secs: f64,
    pub away_secs: f64,
    /// Label held since `last_update`; the next delta is credited to it.
    pub classification: Classification,
    #[serde(skip)]
    pub last_update: Option<Instant>,
    #[serde(skip)]
    pub away: AwayGuard,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        config: &SessionConfig,
        started_at: DateTime<Utc>,
        now: Instant,
    ) {
        *self = Self {
            active: true,
            session_id: Some(session_id),
            session_type: Some(config.session_type),
            session_name: Some(config.name.clone()),
            started_at: Some(started_at),
            target_duration_secs: config.duration_secs,
            elapsed_secs: 0,
            remaining_secs: config.duration_secs,
            focused_secs: 0.0,
            distracted_secs: 0.0,
            away_secs: 0.0,
            classification: Classification::Away,
            last_update: Some(now),
            away: AwayGuard::default(),
        };
    }

    pub fn is_timed(&self) -> bool {
        self.target_duration_secs > 0
    }

    pub fn credit(&mut self, label: Classification, secs: f64) {
        match label {
            Classification::Focused => self.focused_secs += secs,
            Classification::Distracted => self.distracted_secs += secs,
            Classification::Away => self.away_secs += secs,
        }
    }

    /// Moves the time since the last update into the held label without
    /// changing it.
    pub fn settle(&mut self, now: Instant) {
        if let Some(last) = self.last_update {
            let delta = now.saturating_duration_since(last).as_secs_f64();
            self.credit(self.classification, delta);
            self.last_update = Some(now);
        }
    }

    pub fn tracked_secs(&self) -> f64 {
        self.focused_secs + self.distracted_secs + self.away_secs
    }

    pub fn focus_score(&self) -> f64 {
        focus_score(self.focused_secs, self.elapsed_secs)
    }

    pub fn finish(&mut self) {
        self.active = false;
        self.last_update = None;
        self.away.clear();
    }
}

/// Percentage of elapsed session time spent focused, clamped to [0, 100].
pub fn focus_score(focused_secs: f64, elapsed_secs: u64) -> f64 {
    if elapsed_secs == 0 {
        return 0.0;
    }
    let score = 100.0 * focused_secs / elapsed_secs as f64;
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Read-only view handed to the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub session_active: bool,
    pub session_duration: u64,
    pub session_type: Option<SessionType>,
    pub session_name: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub target_duration: u64,
    pub remaining_time: u64,
    pub focused_time: f64,
    pub distracted_time: f64,
    pub away_time: f64,
    pub focus_score: f64,
    pub classification: Classification,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            session_active: state.active,
            session_duration: state.elapsed_secs,
            session_type: state.session_type,
            session_name: state.session_name.clone(),
            started_at: state.started_at,
            target_duration: state.target_duration_secs,
            remaining_time: state.remaining_secs,
            focused_time: state.focused_secs,
            distracted_time: state.distracted_secs,
            away_time: state.away_secs,
            focus_score: state.focus_score(),
            classification: state.classification,
        }
    }
}

impl SessionSnapshot {
    pub fn remaining_display(&self) -> String {
        format_mmss(self.remaining_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub session_type: Option<SessionType>,
    pub started_at: Option<DateTime<Utc>>,
    /// True when the countdown ran out, false for a manual stop.
    pub completed: bool,
    pub duration: u64,
    pub focused_time: f64,
    pub distracted_time: f64,
    pub away_time: f64,
    pub focus_score: f64,
}

impl SessionSummary {
    pub fn from_state(state: &SessionState, completed: bool) -> Self {
        Self {
            session_id: state.session_id.clone().unwrap_or_default(),
            session_type: state.session_type,
            started_at: state.started_at,
            completed,
            duration: state.elapsed_secs,
            focused_time: state.focused_secs,
            distracted_time: state.distracted_secs,
            away_time: state.away_secs,
            focus_score: state.focus_score(),
        }
    }

    pub fn describe(&self) -> String {
        let kind = self
            .session_type
            .map(|t| t.display_name())
            .unwrap_or("Untyped");
        let ending = if self.completed { "completed" } else { "stopped" };
        format!(
            "{kind} session {ending} after {}: focused {:.0}s, distracted {:.0}s, away {:.0}s, score {:.0}%",
            format_mmss(self.duration),
            self.focused_time,
            self.distracted_time,
            self.away_time,
            self.focus_score
        )
    }
}

/// Formats seconds as MM:SS, letting minutes run past 59.
pub fn format_mmss(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
