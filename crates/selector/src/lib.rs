//! Splay - Selector
//!
//! Chooses the single best analyzer for an incoming packet so that, over
//! time, each analyzer's share of delivered *messages* converges to its
//! configured weight.
//!
//! # Design
//!
//! Two phases over one pass of the registry:
//!
//! - **Deviation minimization**: pick the Online analyzer whose deviation
//!   from its ideal share would be smallest *if it received this packet*.
//!   Locally optimal and stable while everyone is near their ideal.
//! - **Deficit override**: an analyzer returning from an Offline spell can
//!   be thousands of messages behind; deviation minimization would repair
//!   that one packet-sized step at a time. When the largest positive
//!   deficit exceeds the configured threshold, the lagging analyzer is
//!   selected outright until it catches up.
//!
//! The selection is pure: it reads atomic counters and mutates nothing.
//! Counters may be slightly stale under concurrency; deviation is a soft
//! metric and tolerates that.
//!
//! # Example
//!
//! ```
//! use splay_registry::{AnalyzerRegistry, HealthPolicy};
//! use splay_selector::Selector;
//!
//! let mut registry = AnalyzerRegistry::new(HealthPolicy::default());
//! registry.register("a", "http://h:8081/analyze", 0.25);
//! registry.register("b", "http://h:8082/analyze", 0.75);
//!
//! let selector = Selector::default();
//! let target = selector.select(&registry, 0, 4).unwrap();
//! assert_eq!(registry.get(target).unwrap().name(), "b");
//! ```

mod selector;


pub use selector::Selector;
