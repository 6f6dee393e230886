//! Recovery sweeper
//!
//! Periodic task that walks the registry and restores Offline analyzers
//! whose cooldown has elapsed. Health checks never sit on the ingest hot
//! path; the sweeper exists solely for the Offline -> Online promotion.

use std::sync::Arc;
use std::time::Duration;

use splay_registry::AnalyzerRegistry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Periodic Offline -> Online promoter.
///
/// Idempotent against success-driven recovery: if a delivery revives an
/// analyzer between ticks, the sweep simply finds nothing to do.
pub struct RecoverySweeper {
    registry: Arc<AnalyzerRegistry>,
    interval: Duration,
    cancel: CancellationToken,
}

impl RecoverySweeper {
    /// Create a sweeper over the given registry.
    pub fn new(
        registry: Arc<AnalyzerRegistry>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            interval,
            cancel,
        }
    }

    /// Spawn the sweeper as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the sweep loop until cancelled.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "recovery sweeper starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let recovered = self.registry.sweep();
                    if recovered > 0 {
                        tracing::info!(recovered, "recovery sweep restored analyzers");
                    }
                }
            }
        }

        tracing::debug!("recovery sweeper stopping");
    }
}
