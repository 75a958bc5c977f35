use log::info;
use serde::Serialize;
use std::sync::{Arc, Mutex};

pub const AWAY_TITLE: &str = "Come back!";
pub const AWAY_BODY: &str = "You've been away from your desk. Ready to refocus?";

pub const COMPLETE_TITLE: &str = "Session Complete";
pub const COMPLETE_BODY: &str = "Great work! Your focus session has ended.";

pub const HYDRATION_TITLE: &str = "Hydration Reminder";
pub const HYDRATION_BODY: &str = "Time for a sip of water.";

/// Fire-and-forget notification delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Writes notifications to the log. Used by the headless runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!("[notify] {}: {}", title, body);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Keeps every notification in memory so callers can inspect what fired.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count_titled(&self, title: &str) -> usize {
        self.sent().iter().filter(|n| n.title == title).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Notification {
                title: title.to_string(),
                body: body.to_string(),
            });
    }
}
