pub mod controller;
pub mod presets;
pub mod state;
pub mod tracker;

pub use controller::TrackerController;
pub use presets::{select, select_custom, select_custom_minutes, select_preset, SelectionError};
pub use state::{
    focus_score, format_mmss, Classification, SessionConfig, SessionSnapshot, SessionState,
    SessionSummary, SessionType,
};
pub use tracker::{DueReport, FocusTracker, TickOutcome};
