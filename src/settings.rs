use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

const DEFAULT_FOCUS_THRESHOLD: f64 = 0.6;
const DEFAULT_AWAY_NOTIFY_AFTER_SECS: u64 = 10;
const DEFAULT_HYDRATION_INTERVAL_SECS: u64 = 30 * 60;
const DEFAULT_HEARTBEAT_EVERY_TICKS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Inclusive lower bound on detection confidence for a `Focused` label.
    pub focus_threshold: f64,
    pub away_notify_after_secs: u64,
    pub hydration_interval_secs: u64,
    pub heartbeat_every_ticks: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            focus_threshold: DEFAULT_FOCUS_THRESHOLD,
            away_notify_after_secs: DEFAULT_AWAY_NOTIFY_AFTER_SECS,
            hydration_interval_secs: DEFAULT_HYDRATION_INTERVAL_SECS,
            heartbeat_every_ticks: DEFAULT_HEARTBEAT_EVERY_TICKS,
        }
    }
}

impl TrackerSettings {
    /// Clamps the threshold into [0, 1] and puts back defaults for values
    /// that would disable a timer or divide by zero.
    pub fn sanitized(mut self) -> Self {
        self.focus_threshold = if self.focus_threshold.is_finite() {
            self.focus_threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_FOCUS_THRESHOLD
        };
        if self.hydration_interval_secs == 0 {
            self.hydration_interval_secs = DEFAULT_HYDRATION_INTERVAL_SECS;
        }
        if self.heartbeat_every_ticks == 0 {
            self.heartbeat_every_ticks = DEFAULT_HEARTBEAT_EVERY_TICKS;
        }
        self
    }

    pub fn away_notify_after(&self) -> Duration {
        Duration::from_secs(self.away_notify_after_secs)
    }

    pub fn hydration_interval(&self) -> Duration {
        Duration::from_secs(self.hydration_interval_secs)
    }
}

/// Where the settings a store starts with came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsOrigin {
    File,
    Missing,
    Unreadable,
}

fn read_settings(path: &Path) -> Result<(TrackerSettings, SettingsOrigin)> {
    if !path.exists() {
        return Ok((TrackerSettings::default(), SettingsOrigin::Missing));
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    match serde_json::from_str::<TrackerSettings>(&contents) {
        Ok(settings) => Ok((settings.sanitized(), SettingsOrigin::File)),
        Err(err) => {
            warn!(
                "Ignoring unreadable settings at {} ({err}); using defaults",
                path.display()
            );
            Ok((TrackerSettings::default(), SettingsOrigin::Unreadable))
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let (data, origin) = read_settings(&path)?;
        match origin {
            SettingsOrigin::File => info!("Loaded tracker settings from {}", path.display()),
            SettingsOrigin::Missing => {
                info!("No settings file at {}; using defaults", path.display())
            }
            SettingsOrigin::Unreadable => {}
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tracker(&self) -> TrackerSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update(&self, settings: TrackerSettings) -> Result<()> {
        let settings = settings.sanitized();
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: TrackerSettings = serde_json::from_str(&contents)?;
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = data.sanitized();
        Ok(())
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.tracker(), TrackerSettings::default());
    }

    #[test]
    fn read_settings_reports_where_values_came_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let (settings, origin) = read_settings(&path).unwrap();
        assert_eq!(origin, SettingsOrigin::Missing);
        assert_eq!(settings, TrackerSettings::default());
        assert!(!path.exists());

        fs::write(&path, "not json").unwrap();
        assert_eq!(read_settings(&path).unwrap().1, SettingsOrigin::Unreadable);

        fs::write(&path, r#"{ "focusThreshold": 0.7 }"#).unwrap();
        let (settings, origin) = read_settings(&path).unwrap();
        assert_eq!(origin, SettingsOrigin::File);
        assert_eq!(settings.focus_threshold, 0.7);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "awayNotifyAfterSecs": 20 }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().tracker();
        assert_eq!(settings.away_notify_after_secs, 20);
        assert_eq!(settings.focus_threshold, 0.6);
        assert_eq!(settings.hydration_interval_secs, 1800);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.tracker(), TrackerSettings::default());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let changed = TrackerSettings {
            focus_threshold: 0.75,
            ..TrackerSettings::default()
        };
        store.update(changed.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.tracker(), changed);
        reopened.reload().unwrap();
        assert_eq!(reopened.tracker(), changed);
    }

    #[test]
    fn sanitize_clamps_threshold_and_restores_zero_periods() {
        let settings = TrackerSettings {
            focus_threshold: 4.0,
            away_notify_after_secs: 0,
            hydration_interval_secs: 0,
            heartbeat_every_ticks: 0,
        }
        .sanitized();

        assert_eq!(settings.focus_threshold, 1.0);
        assert_eq!(settings.away_notify_after_secs, 0);
        assert_eq!(settings.hydration_interval_secs, 1800);
        assert_eq!(settings.heartbeat_every_ticks, 10);
    }
}
