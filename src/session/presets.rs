//! Session-type selection: turns a preset or a custom minute count into a
//! validated [`SessionConfig`].

use thiserror::Error;

use super::state::{SessionConfig, SessionType};

pub const CUSTOM_MIN_MINUTES: i64 = 1;
pub const CUSTOM_MAX_MINUTES: i64 = 180;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("\"{0}\" is not a number; enter a whole number of minutes")]
    NotANumber(String),

    #[error("\"{0}\" is not a whole number of minutes")]
    NotAnInteger(String),

    #[error("custom sessions must be between {min} and {max} minutes (got {minutes})")]
    OutOfRange { minutes: i64, min: i64, max: i64 },

    #[error("custom sessions need a duration in minutes")]
    MissingDuration,
}

/// Config for one of the fixed-length presets. `Custom` needs minutes, so it
/// is rejected here.
pub fn select_preset(session_type: SessionType) -> Result<SessionConfig, SelectionError> {
    let duration_secs = session_type
        .preset_duration_secs()
        .ok_or(SelectionError::MissingDuration)?;

    Ok(SessionConfig {
        session_type,
        duration_secs,
        name: session_type.display_name().to_string(),
    })
}

pub fn select_custom_minutes(minutes: i64) -> Result<SessionConfig, SelectionError> {
    if !(CUSTOM_MIN_MINUTES..=CUSTOM_MAX_MINUTES).contains(&minutes) {
        return Err(SelectionError::OutOfRange {
            minutes,
            min: CUSTOM_MIN_MINUTES,
            max: CUSTOM_MAX_MINUTES,
        });
    }

    Ok(SessionConfig {
        session_type: SessionType::Custom,
        duration_secs: minutes as u64 * 60,
        name: format!("Custom ({minutes} min)"),
    })
}

/// Validates free-text minutes as typed into a form field.
pub fn select_custom(input: &str) -> Result<SessionConfig, SelectionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SelectionError::MissingDuration);
    }

    if let Ok(minutes) = trimmed.parse::<i64>() {
        return select_custom_minutes(minutes);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Err(SelectionError::NotAnInteger(trimmed.to_string())),
        _ => Err(SelectionError::NotANumber(trimmed.to_string())),
    }
}

/// Accepts either a preset name or a custom minute count.
pub fn select(input: &str) -> Result<SessionConfig, SelectionError> {
    match SessionType::parse(input) {
        Some(SessionType::Custom) => Err(SelectionError::MissingDuration),
        Some(preset) => select_preset(preset),
        None => select_custom(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn presets_have_fixed_durations() {
        assert_eq!(select_preset(SessionType::Pomodoro).unwrap().duration_secs, 1500);
        assert_eq!(select_preset(SessionType::DeepWork).unwrap().duration_secs, 5400);
        assert_eq!(select_preset(SessionType::ShortSprint).unwrap().duration_secs, 900);
        assert_eq!(
            select_preset(SessionType::Custom),
            Err(SelectionError::MissingDuration)
        );
    }

    #[test]
    fn custom_bounds_are_inclusive() {
        assert_eq!(select_custom_minutes(1).unwrap().duration_secs, 60);
        assert_eq!(select_custom_minutes(180).unwrap().duration_secs, 10_800);
        assert!(matches!(
            select_custom_minutes(0),
            Err(SelectionError::OutOfRange { minutes: 0, .. })
        ));
        assert!(matches!(
            select_custom_minutes(181),
            Err(SelectionError::OutOfRange { minutes: 181, .. })
        ));
    }

    #[test]
    fn custom_text_validation() {
        let config = select_custom(" 45 ").unwrap();
        assert_eq!(
            config,
            SessionConfig {
                session_type: SessionType::Custom,
                duration_secs: 2700,
                name: "Custom (45 min)".into(),
            }
        );

        assert_eq!(
            select_custom("2.5"),
            Err(SelectionError::NotAnInteger("2.5".into()))
        );
        assert_eq!(
            select_custom("soon"),
            Err(SelectionError::NotANumber("soon".into()))
        );
        assert_eq!(select_custom(""), Err(SelectionError::MissingDuration));
        assert!(select_custom("-5").is_err());
    }

    #[test]
    fn errors_read_well() {
        let err = select_custom_minutes(500).unwrap_err();
        assert_eq!(
            err.to_string(),
            "custom sessions must be between 1 and 180 minutes (got 500)"
        );
    }

    #[test]
    fn select_accepts_names_or_minutes() {
        assert_eq!(select("sprint").unwrap().session_type, SessionType::ShortSprint);
        assert_eq!(select("20").unwrap().duration_secs, 1200);
        assert_eq!(select("custom"), Err(SelectionError::MissingDuration));
    }
}
