//! Dispatch pipeline tests
//!
//! These run real HTTP against in-process mock analyzers bound to
//! ephemeral ports.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use splay_registry::{AnalyzerId, AnalyzerRegistry, HealthPolicy};
use tokio_util::sync::CancellationToken;

use crate::{DispatchConfig, DispatchError, DispatchJob, DispatchPipeline, DistributorMetrics};

/// In-process analyzer double: counts what it accepts, can be told to fail
/// or to respond slowly.
struct MockAnalyzer {
    messages: AtomicU64,
    packets: AtomicU64,
    failing: AtomicBool,
    delay: Duration,
}

async fn analyze(State(state): State<Arc<MockAnalyzer>>, body: Bytes) -> StatusCode {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    if state.failing.load(Ordering::Relaxed) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let count = value["messages"].as_array().map(|m| m.len()).unwrap_or(0) as u64;

    state.messages.fetch_add(count, Ordering::Relaxed);
    state.packets.fetch_add(1, Ordering::Relaxed);
    StatusCode::ACCEPTED
}

/// Spawn a mock analyzer on an ephemeral port, returning its endpoint URL.
async fn spawn_analyzer(failing: bool, delay: Duration) -> (String, Arc<MockAnalyzer>) {
    let state = Arc::new(MockAnalyzer {
        messages: AtomicU64::new(0),
        packets: AtomicU64::new(0),
        failing: AtomicBool::new(failing),
        delay,
    });

    let app = Router::new()
        .route("/api/v1/analyze", post(analyze))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api/v1/analyze"), state)
}

/// Build a dispatch job carrying `messages` single-line log messages.
fn test_job(target: AnalyzerId, messages: usize) -> DispatchJob {
    let body = serde_json::json!({
        "packetId": "pkt-test",
        "agentId": "agent-test",
        "messages": (0..messages)
            .map(|i| serde_json::json!({"level": "INFO", "message": format!("line {i}")}))
            .collect::<Vec<_>>(),
    });

    DispatchJob {
        packet_id: "pkt-test".into(),
        target,
        message_count: messages as u64,
        body: Bytes::from(serde_json::to_vec(&body).unwrap()),
    }
}

/// Poll `condition` until it holds or `deadline` elapses.
async fn wait_for(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

fn single_analyzer_registry(endpoint: &str) -> Arc<AnalyzerRegistry> {
    let mut registry = AnalyzerRegistry::new(HealthPolicy::default());
    registry.register("analyzer-1", endpoint, 1.0);
    Arc::new(registry)
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn test_successful_delivery_updates_counters() {
    let (endpoint, mock) = spawn_analyzer(false, Duration::ZERO).await;
    let registry = single_analyzer_registry(&endpoint);
    let metrics = Arc::new(DistributorMetrics::new());

    let pipeline = DispatchPipeline::spawn(
        DispatchConfig {
            queue_capacity: 100,
            workers: 4,
            request_timeout: Duration::from_secs(5),
        },
        Arc::clone(&registry),
        Arc::clone(&metrics),
        CancellationToken::new(),
    )
    .unwrap();

    let target = registry.lookup("analyzer-1").unwrap().id();
    for _ in 0..10 {
        pipeline.enqueue(test_job(target, 3)).unwrap();
    }

    let delivered = wait_for(Duration::from_secs(5), || {
        metrics.snapshot().packets_processed == 10
    })
    .await;
    assert!(delivered, "expected 10 deliveries");

    assert_eq!(mock.messages.load(Ordering::Relaxed), 30);
    assert_eq!(registry.lookup("analyzer-1").unwrap().message_count(), 30);
    assert_eq!(metrics.messages_processed(), 30);
    assert_eq!(metrics.snapshot().packets_dropped, 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_rejecting_analyzer_goes_offline() {
    let (endpoint, mock) = spawn_analyzer(true, Duration::ZERO).await;
    let registry = single_analyzer_registry(&endpoint);
    let metrics = Arc::new(DistributorMetrics::new());

    let pipeline = DispatchPipeline::spawn(
        DispatchConfig {
            queue_capacity: 100,
            workers: 1,
            request_timeout: Duration::from_secs(5),
        },
        Arc::clone(&registry),
        Arc::clone(&metrics),
        CancellationToken::new(),
    )
    .unwrap();

    let analyzer = registry.lookup("analyzer-1").unwrap();
    for _ in 0..3 {
        pipeline.enqueue(test_job(analyzer.id(), 2)).unwrap();
    }

    let dropped = wait_for(Duration::from_secs(5), || {
        metrics.snapshot().packets_dropped == 3
    })
    .await;
    assert!(dropped, "expected 3 failed deliveries");

    // Default threshold is 3 consecutive failures
    assert!(!analyzer.is_online());
    assert_eq!(analyzer.message_count(), 0);
    assert_eq!(metrics.messages_processed(), 0);
    assert_eq!(mock.messages.load(Ordering::Relaxed), 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_counts_drop() {
    // Discard port: connection refused almost immediately
    let registry = single_analyzer_registry("http://127.0.0.1:9/api/v1/analyze");
    let metrics = Arc::new(DistributorMetrics::new());

    let pipeline = DispatchPipeline::spawn(
        DispatchConfig {
            queue_capacity: 10,
            workers: 1,
            request_timeout: Duration::from_secs(2),
        },
        Arc::clone(&registry),
        Arc::clone(&metrics),
        CancellationToken::new(),
    )
    .unwrap();

    let target = registry.lookup("analyzer-1").unwrap().id();
    pipeline.enqueue(test_job(target, 1)).unwrap();

    let dropped = wait_for(Duration::from_secs(5), || {
        metrics.snapshot().packets_dropped == 1
    })
    .await;
    assert!(dropped);
    assert_eq!(registry.lookup("analyzer-1").unwrap().consecutive_failures(), 1);

    pipeline.shutdown().await;
}

// ============================================================================
// Backpressure and shutdown
// ============================================================================

#[tokio::test]
async fn test_queue_overflow_drops_are_counted() {
    // One slow worker with a single-slot shard: most of a burst overflows
    let (endpoint, _mock) = spawn_analyzer(false, Duration::from_millis(300)).await;
    let registry = single_analyzer_registry(&endpoint);
    let metrics = Arc::new(DistributorMetrics::new());

    let pipeline = DispatchPipeline::spawn(
        DispatchConfig {
            queue_capacity: 1,
            workers: 1,
            request_timeout: Duration::from_secs(5),
        },
        Arc::clone(&registry),
        Arc::clone(&metrics),
        CancellationToken::new(),
    )
    .unwrap();

    let target = registry.lookup("analyzer-1").unwrap().id();
    let mut overflowed = 0;
    for _ in 0..10 {
        match pipeline.enqueue(test_job(target, 1)) {
            Ok(()) => {}
            Err(DispatchError::QueueFull) => overflowed += 1,
            Err(other) => panic!("unexpected enqueue error: {other}"),
        }
    }

    assert!(overflowed > 0, "burst should overflow a single-slot queue");
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.packets_dropped, overflowed);
    assert_eq!(snapshot.packets_queued + overflowed, 10);

    // Every accepted packet eventually settles as processed (or dropped at
    // shutdown); nothing vanishes
    pipeline.shutdown().await;
    let snapshot = metrics.snapshot();
    assert_eq!(
        snapshot.packets_processed + snapshot.packets_dropped,
        10,
        "all packets must be accounted for"
    );
}

#[tokio::test]
async fn test_enqueue_after_shutdown_is_closed() {
    let (endpoint, _mock) = spawn_analyzer(false, Duration::ZERO).await;
    let registry = single_analyzer_registry(&endpoint);
    let metrics = Arc::new(DistributorMetrics::new());

    let pipeline = DispatchPipeline::spawn(
        DispatchConfig::default(),
        Arc::clone(&registry),
        Arc::clone(&metrics),
        CancellationToken::new(),
    )
    .unwrap();

    pipeline.shutdown().await;

    let target = registry.lookup("analyzer-1").unwrap().id();
    let result = pipeline.enqueue(test_job(target, 1));
    assert!(matches!(result, Err(DispatchError::QueueClosed)));
    assert_eq!(metrics.snapshot().packets_dropped, 1);
}

#[tokio::test]
async fn test_queue_depth_reflects_pending_work() {
    let (endpoint, _mock) = spawn_analyzer(false, Duration::from_millis(500)).await;
    let registry = single_analyzer_registry(&endpoint);
    let metrics = Arc::new(DistributorMetrics::new());

    let pipeline = DispatchPipeline::spawn(
        DispatchConfig {
            queue_capacity: 8,
            workers: 1,
            request_timeout: Duration::from_secs(5),
        },
        Arc::clone(&registry),
        Arc::clone(&metrics),
        CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(pipeline.queue_depth(), 0);

    let target = registry.lookup("analyzer-1").unwrap().id();
    for _ in 0..4 {
        pipeline.enqueue(test_job(target, 1)).unwrap();
    }
    assert!(pipeline.queue_depth() > 0);

    pipeline.shutdown().await;
}
