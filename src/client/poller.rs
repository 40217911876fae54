//! Long-running polling loop

use std::{sync::Arc, time::Duration};

use tokio::{sync::broadcast, time::sleep};
use tracing::{debug, error, info, instrument};

use super::{
    config::PollingConfig,
    service::{HomeworkService, Iteration},
};
use crate::id::Cursor;

/// Where the loop goes after an iteration
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Last iteration ran to completion, whatever it found
    Polling,
    /// Last iteration died unexpectedly
    Backoff,
}

impl PollState {
    pub fn delay(self, config: &PollingConfig) -> Duration {
        match self {
            Self::Polling => config.interval,
            Self::Backoff => config.error_backoff,
        }
    }
}

/// Background poller for homework status changes
///
/// Owns the cursor and runs iterations strictly one after another until a
/// shutdown signal arrives.
pub struct HomeworkPoller {
    service: Arc<HomeworkService>,
    config: PollingConfig,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl HomeworkPoller {
    pub fn new(service: Arc<HomeworkService>, config: PollingConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self { service, config, shutdown_tx, shutdown_rx }
    }

    /// Poll from `cursor` until shut down, returning the final cursor
    #[instrument(skip(self), fields(interval = ?self.config.interval, backoff = ?self.config.error_backoff))]
    pub async fn start(mut self, mut cursor: Cursor) -> Cursor {
        info!(cursor = %cursor, "Starting homework poller");

        loop {
            debug!(cursor = %cursor, "Polling homework statuses");
            let state = match self.run_guarded(cursor).await {
                Some(iteration) => {
                    cursor = iteration.cursor;
                    PollState::Polling
                },
                None => PollState::Backoff,
            };

            let delay = state.delay(&self.config);
            debug!(?state, ?delay, "Sleeping until next poll");

            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.shutdown_rx.recv() => {
                    debug!("Homework poller received shutdown signal");
                    break;
                }
            }
        }

        info!(cursor = %cursor, "Homework poller stopped");
        cursor
    }

    /// Run one iteration in its own task so a panic inside it is contained
    async fn run_guarded(&self, cursor: Cursor) -> Option<Iteration> {
        let service = Arc::clone(&self.service);
        match tokio::spawn(async move { service.run_iteration(cursor).await }).await {
            Ok(iteration) => Some(iteration),
            Err(e) => {
                error!(error = %e, cursor = %cursor, "Homework poll aborted unexpectedly");
                None
            },
        }
    }

    /// Send shutdown signal to stop polling
    pub fn shutdown(&self) {
        debug!("Sending shutdown signal to homework poller");
        let _ = self.shutdown_tx.send(());
    }

    /// Get a shutdown sender for external shutdown control
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Get current polling configuration
    pub fn config(&self) -> &PollingConfig {
        &self.config
    }
}
