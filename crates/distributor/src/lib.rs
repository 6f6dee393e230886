//! Splay - Distributor service
//!
//! Ingests batched log packets over HTTP and forwards each packet,
//! atomically, to exactly one downstream analyzer so that the per-analyzer
//! share of delivered *messages* converges to the configured weights.
//!
//! # Flow
//!
//! ```text
//! POST /api/v1/distribute
//!        │ decode + count
//!        ▼
//!    Selector (weights, counts, health)
//!        │ target
//!        ▼
//!    DispatchPipeline ──→ worker ──→ POST analyzer endpoint
//!                                      │ 2xx: counters + recovery
//!                                      └ else: dropped + health failure
//! ```
//!
//! The binary entry point lives in `main.rs`; this library exposes the
//! HTTP surface and wiring so integration tests can drive the full stack
//! in-process.

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{build_router, run, ServerError};
