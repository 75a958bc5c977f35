use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::Classification;

/// One observation from the face detector.
///
/// `confidence` only means something when `face_detected` is true.
/// `timestamp` is advisory; the tracker timestamps events with its own clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionEvent {
    pub face_detected: bool,
    pub confidence: f64,
    pub timestamp: Option<i64>,
}

impl DetectionEvent {
    pub fn present(confidence: f64) -> Self {
        Self {
            face_detected: true,
            confidence,
            timestamp: None,
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Labels this event. `threshold` is inclusive; a NaN confidence never
    /// reaches it.
    pub fn classify(&self, threshold: f64) -> Classification {
        if !self.face_detected {
            Classification::Away
        } else if self.confidence >= threshold {
            Classification::Focused
        } else {
            Classification::Distracted
        }
    }

    /// Lenient decode for detector output. Fields with the wrong type or
    /// missing entirely fall back to their defaults, so anything unusable
    /// reads as "no face".
    pub fn from_json_lenient(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!("unparseable detection event ({err}); treating as absent");
                return Self::absent();
            }
        };

        let Some(fields) = value.as_object() else {
            warn!("detection event is not an object; treating as absent");
            return Self::absent();
        };

        Self {
            face_detected: fields
                .get("faceDetected")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            confidence: fields
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            timestamp: fields.get("timestamp").and_then(Value::as_i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(
            DetectionEvent::present(0.6).classify(0.6),
            Classification::Focused
        );
        assert_eq!(
            DetectionEvent::present(0.599999).classify(0.6),
            Classification::Distracted
        );
    }

    #[test]
    fn no_face_is_away_regardless_of_confidence() {
        let event = DetectionEvent {
            face_detected: false,
            confidence: 0.99,
            timestamp: None,
        };
        assert_eq!(event.classify(0.6), Classification::Away);
    }

    #[test]
    fn nan_confidence_is_distracted() {
        assert_eq!(
            DetectionEvent::present(f64::NAN).classify(0.6),
            Classification::Distracted
        );
    }

    #[test]
    fn lenient_decode_reads_well_formed_events() {
        let event = DetectionEvent::from_json_lenient(
            r#"{"faceDetected": true, "confidence": 0.82, "timestamp": 1700000000000}"#,
        );
        assert_eq!(event, DetectionEvent::present(0.82).with_timestamp(1_700_000_000_000));
    }

    #[test]
    fn lenient_decode_fails_safe_to_absent() {
        for raw in [
            r#"{"confidence": 0.9}"#,
            r#"{"faceDetected": "yes", "confidence": 0.9}"#,
            r#"{"faceDetected": null}"#,
            "[1, 2, 3]",
            "not json at all",
        ] {
            let event = DetectionEvent::from_json_lenient(raw);
            assert!(!event.face_detected, "{raw} should read as absent");
            assert_eq!(event.classify(0.6), Classification::Away);
        }
    }

    #[test]
    fn serde_uses_camel_case_and_defaults() {
        let event: DetectionEvent = serde_json::from_str(r#"{"confidence": 0.4}"#).unwrap();
        assert!(!event.face_detected);

        let json = serde_json::to_value(DetectionEvent::present(0.7)).unwrap();
        assert_eq!(json["faceDetected"], Value::Bool(true));
    }
}
