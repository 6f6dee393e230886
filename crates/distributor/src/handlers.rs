//! HTTP route handlers
//!
//! The ingest adapter plus the operational endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/v1/distribute` - packet ingest (canonical)
//! - `POST /api/v1/logs` - historical alias for the same handler
//! - `GET /api/v1/health` - liveness check
//! - `GET /api/v1/metrics/performance` - throughput and loss counters
//! - `GET /api/v1/metrics/analyzers` - per-analyzer state
//!
//! The ingest handler answers 202 as soon as the packet is decoded and
//! handed to the dispatch pipeline (or dropped, with the counters telling
//! the truth); the client never waits for delivery.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use splay_dispatch::{DispatchJob, DispatchPipeline, DistributorMetrics};
use splay_protocol::LogPacket;
use splay_registry::AnalyzerRegistry;
use splay_selector::Selector;

/// Shared state for handlers
pub struct AppState {
    pub registry: Arc<AnalyzerRegistry>,
    pub selector: Selector,
    pub pipeline: Arc<DispatchPipeline>,
    pub metrics: Arc<DistributorMetrics>,
}

/// POST /api/v1/distribute - ingest a log packet
///
/// The body is parsed from raw bytes rather than through an extractor so
/// that malformed JSON is a plain 400 and the original bytes can ride
/// through to the analyzer untouched.
pub async fn distribute(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let packet: LogPacket = match serde_json::from_slice(&body) {
        Ok(packet) => packet,
        Err(error) => {
            return error_response(StatusCode::BAD_REQUEST, "malformed_packet", error.to_string());
        }
    };

    if packet.messages.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "empty_packet",
            "packet carries no messages",
        );
    }

    state.metrics.record_received();
    tracing::debug!(
        packet = %packet.packet_id,
        agent = %packet.agent_id,
        messages = packet.message_count(),
        "packet received"
    );

    let messages = packet.message_count();
    let total = state.metrics.messages_processed();

    match state.selector.select(&state.registry, total, messages) {
        Some(target) => {
            let job = DispatchJob {
                packet_id: packet.packet_id,
                target,
                message_count: messages,
                body,
            };
            // enqueue does its own queued/dropped accounting; overflow is
            // not the client's problem - it already has its 202
            let _ = state.pipeline.enqueue(job);
        }
        None => {
            state.metrics.record_dropped();
            tracing::warn!(
                packet = %packet.packet_id,
                "packet dropped: no analyzer available"
            );
        }
    }

    StatusCode::ACCEPTED.into_response()
}

/// GET /api/v1/health - liveness check
pub async fn health_check() -> Response {
    (StatusCode::OK, "Distributor is online.\n").into_response()
}

/// GET /api/v1/metrics/performance - process-wide throughput counters
pub async fn performance_metrics(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.metrics.snapshot();

    Json(json!({
        "packetsPerSecond": snapshot.packets_per_second(),
        "messagesPerSecond": snapshot.messages_per_second(),
        "errorRate": snapshot.error_rate(),
        "queueSize": state.pipeline.queue_depth(),
        "totalMessages": snapshot.messages_processed,
        "packetsReceived": snapshot.packets_received,
        "packetsQueued": snapshot.packets_queued,
        "packetsProcessed": snapshot.packets_processed,
        "packetsDropped": snapshot.packets_dropped,
        "packetsInFlight": snapshot.packets_in_flight(),
        "uptimeMs": snapshot.uptime_ms,
    }))
}

/// GET /api/v1/metrics/analyzers - per-analyzer registry state
pub async fn analyzer_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let analyzers: Vec<serde_json::Value> = state
        .registry
        .snapshot()
        .into_iter()
        .map(|a| {
            json!({
                "id": a.name,
                "endpoint": a.endpoint,
                "weight": a.weight,
                "messageCount": a.message_count,
                "online": a.online,
                "consecutiveFailures": a.consecutive_failures,
            })
        })
        .collect();

    Json(json!({ "analyzers": analyzers }))
}

/// Create a JSON error response
fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    let body = json!({
        "error": error,
        "message": message.into(),
    });
    (status, Json(body)).into_response()
}

#[cfg(test)]
#[path = "handlers_test.rs"]
mod handlers_test;
