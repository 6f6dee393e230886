//! Analyzer descriptor and runtime state
//!
//! The descriptor (name, endpoint, weight) is immutable after registration.
//! Runtime state is atomic scalars shared by the selector (reads), the
//! dispatch workers (success/failure writes) and the recovery sweeper.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::analyzer_id::AnalyzerId;
use crate::health::HealthPolicy;

/// One downstream analyzer: static descriptor plus atomic runtime state.
///
/// # Thread Safety
///
/// All mutation goes through atomics. `message_count` is monotonically
/// non-decreasing for any reader; health transitions use swap/CAS so the
/// success path and the sweeper can race without double-reporting.
#[derive(Debug)]
pub struct Analyzer {
    /// Dense index assigned at registration
    id: AnalyzerId,

    /// Operator-assigned unique name
    name: String,

    /// URL packets are POSTed to
    endpoint: String,

    /// Target long-run fraction of total messages
    weight: f64,

    /// Messages successfully delivered; bumped only after a 2xx response
    message_count: AtomicU64,

    /// Failures since the last success
    consecutive_failures: AtomicU32,

    /// Epoch-ms of the most recent failure (0 = never failed)
    last_failure_ms: AtomicU64,

    /// Selector-visible health state; starts true
    online: AtomicBool,
}

impl Analyzer {
    pub(crate) fn new(
        id: AnalyzerId,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            endpoint: endpoint.into(),
            weight,
            message_count: AtomicU64::new(0),
            consecutive_failures: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(0),
            online: AtomicBool::new(true),
        }
    }

    /// Dense registry index
    #[inline]
    pub fn id(&self) -> AnalyzerId {
        self.id
    }

    /// Operator-assigned name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivery endpoint URL
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured weight
    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Messages delivered so far
    #[inline]
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    /// Failures since the last success
    #[inline]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Epoch-ms of the most recent failure (0 = never failed)
    #[inline]
    pub fn last_failure_ms(&self) -> u64 {
        self.last_failure_ms.load(Ordering::Relaxed)
    }

    /// Selector-visible health state
    #[inline]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Record a successful delivery of `messages` messages.
    ///
    /// Adds to the delivered count, clears the failure streak and revives
    /// the analyzer if it was Offline - a successful send is itself
    /// evidence of recovery, and this races benignly with the sweeper.
    ///
    /// Returns `true` if the analyzer transitioned Offline -> Online.
    pub fn record_success(&self, messages: u64) -> bool {
        self.message_count.fetch_add(messages, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);

        // swap returns the previous state; only one racing reviver sees false
        !self.online.swap(true, Ordering::SeqCst)
    }

    /// Record a failed delivery attempt at `now_ms`.
    ///
    /// Increments the failure streak and stamps the failure time. Once the
    /// streak reaches the policy threshold an Online analyzer transitions
    /// to Offline.
    ///
    /// Returns `true` if the analyzer transitioned Online -> Offline.
    pub fn record_failure(&self, now_ms: u64, policy: &HealthPolicy) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_failure_ms.store(now_ms, Ordering::Relaxed);

        if failures >= policy.max_consecutive_failures {
            // swap returns the previous state; only the transitioning call
            // sees true
            self.online.swap(false, Ordering::SeqCst)
        } else {
            false
        }
    }

    /// Restore an Offline analyzer whose cooldown has elapsed.
    ///
    /// Returns `true` if this call performed the Offline -> Online
    /// transition. Idempotent against a concurrent success-driven revival.
    pub fn try_revive(&self, now_ms: u64, policy: &HealthPolicy) -> bool {
        if self.online.load(Ordering::Relaxed) {
            return false;
        }

        let last_failure = self.last_failure_ms.load(Ordering::Relaxed);
        if last_failure == 0 || now_ms.saturating_sub(last_failure) <= policy.offline_timeout_ms() {
            return false;
        }

        if self
            .online
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Point-in-time copy of this analyzer's state.
    ///
    /// Fields are read individually; the snapshot is not mutually
    /// consistent under concurrent updates, which readers tolerate.
    pub fn snapshot(&self) -> AnalyzerSnapshot {
        AnalyzerSnapshot {
            id: self.id,
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            weight: self.weight,
            message_count: self.message_count(),
            consecutive_failures: self.consecutive_failures(),
            online: self.is_online(),
        }
    }
}

/// Point-in-time copy of one analyzer's descriptor and runtime state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSnapshot {
    /// Dense registry index
    pub id: AnalyzerId,
    /// Operator-assigned name
    pub name: String,
    /// Delivery endpoint URL
    pub endpoint: String,
    /// Configured weight
    pub weight: f64,
    /// Messages delivered so far
    pub message_count: u64,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Health state at snapshot time
    pub online: bool,
}
