use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::sources::{simulated_loop, stdin_loop, SourceKind};
use super::DetectionEvent;

/// Owns the task feeding detection events into the tracker's queue.
pub struct DetectionController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl DetectionController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn start(&mut self, kind: SourceKind, tx: mpsc::Sender<DetectionEvent>) -> Result<()> {
        if self.handle.is_some() {
            bail!("detection source already active");
        }

        info!("starting {:?} detection source", kind);

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = match kind {
            SourceKind::Stdin => tokio::spawn(stdin_loop(tx, token_clone)),
            SourceKind::Simulated => tokio::spawn(simulated_loop(tx, token_clone)),
        };

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("detection source task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for DetectionController {
    fn default() -> Self {
        Self::new()
    }
}
