use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::DetectionEvent;

/// Detector output rate the simulated source mimics.
pub const SIMULATED_INTERVAL_MS: u64 = 100;

const SIM_LEAVE_PROBABILITY: f64 = 0.002;
const SIM_RETURN_PROBABILITY: f64 = 0.02;
const SIM_GAP_PROBABILITY: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Stdin,
    Simulated,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "stdin" | "-" => Some(Self::Stdin),
            "simulated" | "sim" => Some(Self::Simulated),
            _ => None,
        }
    }
}

pub async fn stdin_loop(tx: mpsc::Sender<DetectionEvent>, cancel_token: CancellationToken) {
    lines_loop(BufReader::new(tokio::io::stdin()), tx, cancel_token).await;
}

/// Reads one JSON detection event per line until end of input or cancellation.
/// Blank lines are skipped; unreadable lines arrive as absent events.
pub async fn lines_loop<R>(
    reader: R,
    tx: mpsc::Sender<DetectionEvent>,
    cancel_token: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let event = DetectionEvent::from_json_lenient(&line);
                        if tx.send(event).await.is_err() {
                            debug!("detection receiver dropped; stopping stdin source");
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("detection input closed");
                        break;
                    }
                    Err(err) => {
                        log::error!("failed to read detection input: {err}");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("stdin detection source shutting down");
                break;
            }
        }
    }
}

/// Noisy presence generator: long runs at the desk with wandering confidence,
/// occasional absences, and dropped frames.
pub struct SimulatedPresence {
    rng: StdRng,
    present: bool,
    confidence: f64,
}

impl SimulatedPresence {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            present: true,
            confidence: 0.8,
        }
    }

    /// Next frame, or `None` when the detector produced nothing this interval.
    pub fn next_event(&mut self) -> Option<DetectionEvent> {
        let flip = if self.present {
            SIM_LEAVE_PROBABILITY
        } else {
            SIM_RETURN_PROBABILITY
        };
        if self.rng.gen_bool(flip) {
            self.present = !self.present;
        }

        if self.rng.gen_bool(SIM_GAP_PROBABILITY) {
            return None;
        }

        if !self.present {
            return Some(DetectionEvent::absent());
        }

        let drift: f64 = self.rng.gen_range(-0.05..=0.05);
        self.confidence = (self.confidence + drift).clamp(0.3, 0.99);
        Some(DetectionEvent::present(self.confidence))
    }
}

impl Default for SimulatedPresence {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn simulated_loop(tx: mpsc::Sender<DetectionEvent>, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_millis(SIMULATED_INTERVAL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut presence = SimulatedPresence::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(event) = presence.next_event() else {
                    continue;
                };
                let event = event.with_timestamp(chrono::Utc::now().timestamp_millis());
                if tx.send(event).await.is_err() {
                    debug!("detection receiver dropped; stopping simulated source");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                info!("simulated detection source shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parse() {
        assert_eq!(SourceKind::parse("stdin"), Some(SourceKind::Stdin));
        assert_eq!(SourceKind::parse(" SIM "), Some(SourceKind::Simulated));
        assert_eq!(SourceKind::parse("camera"), None);
    }

    #[test]
    fn simulated_presence_stays_in_range() {
        let mut presence = SimulatedPresence::seeded(7);
        let mut emitted = 0;
        for _ in 0..5_000 {
            if let Some(event) = presence.next_event() {
                emitted += 1;
                if event.face_detected {
                    assert!((0.3..=0.99).contains(&event.confidence));
                }
            }
        }
        assert!(emitted > 4_000, "gaps should be the exception, got {emitted}");
    }

    #[tokio::test]
    async fn lines_loop_skips_blanks_and_ends_on_eof() {
        let input: &[u8] = b"{\"faceDetected\":true,\"confidence\":0.9}\n\nnot json\n";
        let (tx, mut rx) = mpsc::channel(16);

        let handle = tokio::spawn(lines_loop(input, tx, CancellationToken::new()));

        assert_eq!(rx.recv().await, Some(DetectionEvent::present(0.9)));
        assert_eq!(rx.recv().await, Some(DetectionEvent::absent()));
        // The sender goes away once the reader hits end of input.
        assert_eq!(rx.recv().await, None);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_loop_stops_on_cancel() {
        let (tx, mut rx) = mpsc::channel(16);
        let token = CancellationToken::new();
        let handle = tokio::spawn(simulated_loop(tx, token.clone()));

        let first = rx.recv().await;
        assert!(first.is_some());

        token.cancel();
        handle.await.unwrap();
    }
}
