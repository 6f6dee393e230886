//! Two-phase weighted selection

use splay_registry::{AnalyzerId, AnalyzerRegistry};

/// Default deficit (in messages) that triggers emergency catch-up.
pub const DEFAULT_DEFICIT_THRESHOLD: f64 = 1000.0;

/// Weighted analyzer selector.
///
/// Cheap to construct and `Copy`; the registry carries all mutable state.
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    /// Positive deficit that triggers the catch-up override
    deficit_threshold: f64,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(DEFAULT_DEFICIT_THRESHOLD)
    }
}

impl Selector {
    /// Create a selector with the given deficit threshold.
    #[must_use]
    pub fn new(deficit_threshold: f64) -> Self {
        Self { deficit_threshold }
    }

    /// The configured deficit threshold.
    #[inline]
    pub fn deficit_threshold(&self) -> f64 {
        self.deficit_threshold
    }

    /// Choose the target analyzer for a packet carrying `incoming` messages.
    ///
    /// `total_messages` is the process-wide delivered-message total at call
    /// time. Returns `None` when no analyzer is Online (the caller drops
    /// the packet).
    ///
    /// Ties in the deviation pass go to the first analyzer in registration
    /// order; ties in the deficit pass likewise (strict comparisons).
    pub fn select(
        &self,
        registry: &AnalyzerRegistry,
        total_messages: u64,
        incoming: u64,
    ) -> Option<AnalyzerId> {
        let mut best: Option<AnalyzerId> = None;
        let mut min_deviation = f64::MAX;
        let mut most_behind: Option<AnalyzerId> = None;
        let mut max_deficit = 0.0_f64;

        let future_total = (total_messages + incoming) as f64;

        for analyzer in registry.analyzers() {
            if !analyzer.is_online() {
                continue;
            }

            let current = analyzer.message_count();
            let current_ideal = total_messages as f64 * analyzer.weight();
            let current_deficit = current_ideal - current as f64;

            let future_ideal = future_total * analyzer.weight();
            let future_count = (current + incoming) as f64;
            let future_deviation = (future_count - future_ideal).abs();

            if current_deficit > max_deficit {
                max_deficit = current_deficit;
                most_behind = Some(analyzer.id());
            }

            if future_deviation < min_deviation {
                min_deviation = future_deviation;
                best = Some(analyzer.id());
            }
        }

        // Emergency catch-up: a large enough lag outranks local optimality
        if max_deficit > self.deficit_threshold {
            if let Some(id) = most_behind {
                return Some(id);
            }
        }

        best
    }
}
