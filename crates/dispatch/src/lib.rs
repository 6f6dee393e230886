//! Splay - Dispatch
//!
//! The bounded asynchronous delivery pipeline between the ingest boundary
//! and the analyzers.
//!
//! # Architecture
//!
//! ```text
//! [Ingest]                [DispatchPipeline]                [Analyzers]
//!   select ──→ enqueue ──→ shard 0 ──→ worker 0 ──┐
//!                    │                            ├──→ HTTP POST ──→ 2xx / failure
//!                    └───→ shard N ──→ worker N ──┘         │
//!                                                           ├─ success: counters + recordSuccess
//!                                                           └─ failure: dropped + recordFailure
//! ```
//!
//! # Key Design
//!
//! - **Sharded bounded queue**: one `tokio::sync::mpsc` channel per worker,
//!   round-robin enqueue; a full shard drops the packet (counted, never
//!   silent)
//! - **Non-blocking ingest**: `try_send` only - the caller never waits for
//!   delivery
//! - **No retries**: a failed POST loses the packet and feeds the health
//!   state machine; durability is a concern for layers above this one
//! - **Graceful shutdown**: workers finish the request in flight, then the
//!   remaining queue is drained into the dropped counter

mod client;
mod error;
mod metrics;
mod pipeline;
mod sweeper;

#[cfg(test)]
mod pipeline_test;

pub use client::{AnalyzerClient, SendError};
pub use error::{DispatchError, Result};
pub use metrics::{DistributorMetrics, DropTracker, MetricsSnapshot};
pub use pipeline::{DispatchConfig, DispatchJob, DispatchPipeline};
pub use sweeper::RecoverySweeper;
