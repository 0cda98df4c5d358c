// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verification Sweeper
//!
//! Background task that prunes the identity gate's attempt cache. Consumed
//! attempts and attempts older than twice the verification window are
//! dropped so abandoned PIX charges do not sit in memory until the LRU
//! evicts them.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::identity::VerificationGate;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct VerificationSweeper {
    gate: Arc<VerificationGate>,
    interval: Duration,
}

impl VerificationSweeper {
    pub fn new(gate: Arc<VerificationGate>) -> Self {
        Self {
            gate,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Verification sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Verification sweeper shutting down");
                    return;
                }
            }

            self.sweep();
        }
    }

    /// One pass. Returns the number of attempts removed.
    pub fn sweep(&self) -> usize {
        let removed = self.gate.prune(Utc::now());
        if removed > 0 {
            debug!(removed, remaining = self.gate.len(), "Pruned verification attempts");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MockVerifier, DEFAULT_VERIFICATION_WINDOW};

    fn gate() -> Arc<VerificationGate> {
        Arc::new(VerificationGate::new(
            Arc::new(MockVerifier),
            DEFAULT_VERIFICATION_WINDOW,
            16,
        ))
    }

    #[test]
    fn sweep_removes_consumed_attempts() {
        let gate = gate();
        gate.issue("used");
        gate.verify("used", "123.456.789-00", None).unwrap();
        gate.consume("used").unwrap();
        gate.issue("pending");

        let sweeper = VerificationSweeper::new(Arc::clone(&gate));
        assert_eq!(sweeper.sweep(), 1);
        assert_eq!(gate.len(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let gate = gate();
        gate.issue_at("old", Utc::now() - chrono::Duration::hours(2));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            VerificationSweeper::new(Arc::clone(&gate))
                .with_interval(Duration::from_millis(10))
                .run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(gate.is_empty());
    }
}
