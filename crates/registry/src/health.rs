//! Health policy
//!
//! Thresholds that drive the per-analyzer Online/Offline state machine.
//! The transitions themselves live on [`crate::Analyzer`].

use std::time::Duration;

/// Thresholds for the analyzer health state machine.
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    /// Consecutive failures before an Online analyzer goes Offline
    pub max_consecutive_failures: u32,

    /// Cooldown after the last failure before the sweeper restores an
    /// Offline analyzer
    pub offline_timeout: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            offline_timeout: Duration::from_secs(30),
        }
    }
}

impl HealthPolicy {
    /// Offline cooldown in epoch-milliseconds terms.
    #[inline]
    pub fn offline_timeout_ms(&self) -> u64 {
        self.offline_timeout.as_millis() as u64
    }
}
