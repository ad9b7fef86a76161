//! Periodic removal of expired sessions

use common::error::DatabaseError;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{clock::Clock, repositories::SessionStore};

/// Time between sweeps.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct SessionSweeper {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions,
            clock,
            interval: SESSION_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Delete every session whose expiry is in the past. Returns the number
    /// of rows removed.
    pub async fn sweep_once(&self) -> Result<u64, DatabaseError> {
        let removed = self.sessions.delete_expired(self.clock.now()).await?;
        debug!("Session sweep removed {} expired sessions", removed);
        Ok(removed)
    }

    /// Sweep immediately, then on every interval tick until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!("Session sweeper started, interval {:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!("Session sweep failed: {}", e);
                    }
                }
            }
        }

        info!("Session sweeper stopped");
    }
}
