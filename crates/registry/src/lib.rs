//! Splay - Analyzer Registry
//!
//! The registry holds the fixed set of downstream analyzers together with
//! each analyzer's mutable runtime state: delivered-message count, health
//! and failure bookkeeping. Membership is compiled once at startup; after
//! that the registry is shared immutably and all mutation goes through
//! atomic fields, so readers (the selector, the stats endpoint) never take
//! a lock.
//!
//! # Design
//!
//! - `AnalyzerId` is a `Copy` u16 index - O(1) array lookup in the hot path
//! - Runtime state is atomic scalars; health transitions are compare-and-set
//! - The Offline -> Online path has two idempotent drivers: a successful
//!   delivery, and the periodic sweep after the cooldown
//!
//! # Example
//!
//! ```
//! use splay_registry::{AnalyzerRegistry, HealthPolicy};
//!
//! let mut registry = AnalyzerRegistry::new(HealthPolicy::default());
//! let id = registry.register("analyzer-1", "http://localhost:8081/api/v1/analyze", 0.5);
//!
//! let analyzer = registry.get(id).unwrap();
//! assert!(analyzer.is_online());
//! assert_eq!(analyzer.message_count(), 0);
//! ```

mod analyzer;
mod analyzer_id;
mod health;
mod registry;


pub use analyzer::{Analyzer, AnalyzerSnapshot};
pub use analyzer_id::AnalyzerId;
pub use health::HealthPolicy;
pub use registry::AnalyzerRegistry;

/// Current epoch milliseconds.
///
/// Health timestamps are plain epoch-ms in atomics so the state machine
/// stays lock-free.
#[inline]
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
