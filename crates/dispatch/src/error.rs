//! Dispatch error types

use thiserror::Error;

/// Errors from the dispatch pipeline
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The outbound HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The target shard is full (backpressure); the packet was dropped
    #[error("dispatch queue is full")]
    QueueFull,

    /// The pipeline is shutting down; the packet was dropped
    #[error("dispatch queue is closed")]
    QueueClosed,
}

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;
