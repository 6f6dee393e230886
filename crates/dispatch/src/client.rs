//! Outbound HTTP client
//!
//! One shared `reqwest::Client` serves every worker: connection reuse
//! across requests, a per-request timeout, and concurrent request support
//! come with it. A "failure" is any non-2xx response, I/O error or timeout.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::error::DispatchError;

/// Errors from a single delivery attempt
#[derive(Debug, Error)]
pub enum SendError {
    /// The analyzer answered outside 2xx
    #[error("analyzer returned HTTP {status}")]
    Status {
        /// The response status code
        status: u16,
    },

    /// Connection error, reset or timeout
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP client for posting packets to analyzers.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct AnalyzerClient {
    client: reqwest::Client,
}

impl AnalyzerClient {
    /// Build a client with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(DispatchError::ClientBuild)?;

        Ok(Self { client })
    }

    /// POST a packet body to an analyzer endpoint.
    ///
    /// The body is the packet exactly as it was received at ingest -
    /// fields the distributor ignores still reach the analyzer.
    pub async fn post_packet(&self, endpoint: &str, body: Bytes) -> Result<(), SendError> {
        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SendError::Status {
                status: status.as_u16(),
            })
        }
    }
}
