//! Analyzer registry
//!
//! Compiled once at startup from configuration; membership never changes
//! afterwards, so concurrent readers need no locking. All per-analyzer
//! mutation goes through the atomic state on [`Analyzer`].

use std::collections::HashMap;

use crate::analyzer::{Analyzer, AnalyzerSnapshot};
use crate::analyzer_id::AnalyzerId;
use crate::health::HealthPolicy;

/// Fixed-membership table of analyzers.
///
/// Registration happens during startup wiring (requires `&mut self`);
/// afterwards the registry is shared behind an `Arc` and only the atomic
/// runtime state mutates.
///
/// # Example
///
/// ```
/// use splay_registry::{AnalyzerRegistry, HealthPolicy};
///
/// let mut registry = AnalyzerRegistry::new(HealthPolicy::default());
/// let a = registry.register("analyzer-1", "http://h1:8081/api/v1/analyze", 0.3);
/// let b = registry.register("analyzer-2", "http://h2:8082/api/v1/analyze", 0.7);
///
/// assert_eq!(registry.len(), 2);
/// assert_eq!(registry.lookup("analyzer-2").unwrap().id(), b);
/// assert_ne!(a, b);
/// ```
#[derive(Debug)]
pub struct AnalyzerRegistry {
    /// Analyzers in registration order, indexed by `AnalyzerId`
    analyzers: Vec<Analyzer>,

    /// Name -> id lookup for configuration and stats paths
    by_name: HashMap<String, AnalyzerId>,

    /// Health thresholds shared by every analyzer
    policy: HealthPolicy,
}

impl AnalyzerRegistry {
    /// Create an empty registry with the given health policy.
    #[must_use]
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            analyzers: Vec::new(),
            by_name: HashMap::new(),
            policy,
        }
    }

    /// Register an analyzer and return its id.
    ///
    /// Registration order is the stable iteration order used for selector
    /// tie-breaks. If the name is already registered, the existing id is
    /// returned and the new descriptor is ignored.
    ///
    /// # Panics
    ///
    /// Panics if more than `AnalyzerId::MAX` analyzers are registered.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        weight: f64,
    ) -> AnalyzerId {
        let name = name.into();
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }

        assert!(
            self.analyzers.len() < AnalyzerId::MAX as usize,
            "analyzer registry full"
        );

        let id = AnalyzerId::new(self.analyzers.len() as u16);
        self.analyzers.push(Analyzer::new(id, name.clone(), endpoint, weight));
        self.by_name.insert(name, id);
        id
    }

    /// Get an analyzer by id.
    #[inline]
    pub fn get(&self, id: AnalyzerId) -> Option<&Analyzer> {
        self.analyzers.get(id.as_usize())
    }

    /// Get an analyzer by name.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&Analyzer> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    /// All analyzers in registration order.
    ///
    /// This is the hot-path accessor: the selector iterates the slice and
    /// reads atomic fields directly, no allocation.
    #[inline]
    pub fn analyzers(&self) -> &[Analyzer] {
        &self.analyzers
    }

    /// Number of registered analyzers.
    #[inline]
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    /// Whether the registry has no analyzers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Number of analyzers currently Online.
    pub fn online_count(&self) -> usize {
        self.analyzers.iter().filter(|a| a.is_online()).count()
    }

    /// The health policy shared by all analyzers.
    #[inline]
    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Restore Offline analyzers whose cooldown elapsed before `now_ms`.
    ///
    /// Returns the number of analyzers promoted. Idempotent against the
    /// success-driven recovery path.
    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let mut recovered = 0;

        for analyzer in &self.analyzers {
            if analyzer.try_revive(now_ms, &self.policy) {
                recovered += 1;
                tracing::info!(
                    analyzer = %analyzer.name(),
                    endpoint = %analyzer.endpoint(),
                    offline_ms = now_ms.saturating_sub(analyzer.last_failure_ms()),
                    "analyzer restored after cooldown"
                );
            }
        }

        recovered
    }

    /// Restore eligible Offline analyzers as of the current time.
    pub fn sweep(&self) -> usize {
        self.sweep_at(crate::now_ms())
    }

    /// Point-in-time copy of every analyzer's state, in registration order.
    pub fn snapshot(&self) -> Vec<AnalyzerSnapshot> {
        self.analyzers.iter().map(Analyzer::snapshot).collect()
    }
}
