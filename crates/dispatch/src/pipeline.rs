//! Dispatch pipeline - sharded queue and worker pool
//!
//! Carries `(packet, target)` pairs from the ingest boundary to a
//! completed HTTP POST (or a recorded failure) without ever blocking the
//! ingest caller beyond a bounded queue insertion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use splay_registry::{now_ms, AnalyzerId, AnalyzerRegistry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::AnalyzerClient;
use crate::error::{DispatchError, Result};
use crate::metrics::{DistributorMetrics, DropTracker};

/// Emit a status log line every this many queued packets
const STATUS_LOG_EVERY: u64 = 1000;

/// Sizing and timeout knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Total queue capacity, divided evenly across worker shards
    pub queue_capacity: usize,

    /// Number of worker tasks (and queue shards)
    pub workers: usize,

    /// Per-outbound-POST timeout
    pub request_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            workers: 50,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// One unit of dispatch work: a packet bound for a specific analyzer.
///
/// `body` is the packet exactly as received at ingest; the worker POSTs
/// those bytes unmodified.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    /// Correlation id for logging
    pub packet_id: String,

    /// Target chosen by the selector
    pub target: AnalyzerId,

    /// Number of messages the packet carries
    pub message_count: u64,

    /// Raw packet bytes to POST
    pub body: Bytes,
}

/// Bounded dispatch pipeline: sharded queue plus worker pool.
///
/// # Design
///
/// - One bounded channel per worker; enqueue round-robins across shards by
///   an atomic counter, so total queued work is bounded by
///   `queue_capacity` and producers never contend on a single lock
/// - `try_send` only: a full shard means the packet is dropped and
///   counted, keeping ingest latency bounded
/// - Workers are cooperative tasks; each one drives at most one outbound
///   request at a time, so `workers` also caps outbound concurrency
///
/// # Example
///
/// ```ignore
/// let pipeline = DispatchPipeline::spawn(
///     DispatchConfig::default(),
///     Arc::clone(&registry),
///     Arc::clone(&metrics),
///     cancel.clone(),
/// )?;
///
/// pipeline.enqueue(job)?;
/// // ...
/// pipeline.shutdown().await;
/// ```
pub struct DispatchPipeline {
    /// One sender per worker shard
    shards: Vec<mpsc::Sender<DispatchJob>>,

    /// Round-robin shard cursor
    next_shard: AtomicU64,

    /// Process-wide counters (shared with ingest and stats)
    metrics: Arc<DistributorMetrics>,

    /// Rate-limited overflow logging
    drop_tracker: DropTracker,

    /// Worker join handles, taken at shutdown
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,

    /// Cancelled to stop the workers
    cancel: CancellationToken,
}

impl DispatchPipeline {
    /// Build the pipeline and spawn its workers.
    ///
    /// Each worker owns one queue shard of capacity
    /// `queue_capacity / workers` (at least 1).
    pub fn spawn(
        config: DispatchConfig,
        registry: Arc<AnalyzerRegistry>,
        metrics: Arc<DistributorMetrics>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let client = AnalyzerClient::new(config.request_timeout)?;
        let worker_count = config.workers.max(1);
        let shard_capacity = (config.queue_capacity / worker_count).max(1);

        let mut shards = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let (tx, rx) = mpsc::channel(shard_capacity);
            shards.push(tx);

            let worker = Worker {
                id: worker_id,
                rx,
                registry: Arc::clone(&registry),
                metrics: Arc::clone(&metrics),
                client: client.clone(),
                cancel: cancel.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        tracing::info!(
            workers = worker_count,
            shard_capacity,
            request_timeout_secs = config.request_timeout.as_secs(),
            "dispatch pipeline started"
        );

        Ok(Self {
            shards,
            next_shard: AtomicU64::new(0),
            metrics,
            drop_tracker: DropTracker::new(),
            workers: tokio::sync::Mutex::new(handles),
            cancel,
        })
    }

    /// Enqueue a job without blocking.
    ///
    /// On success the queued counter is bumped; on overflow or shutdown the
    /// packet is dropped and counted before the error is returned, so
    /// callers never need their own drop accounting.
    pub fn enqueue(&self, job: DispatchJob) -> Result<()> {
        let shard =
            (self.next_shard.fetch_add(1, Ordering::Relaxed) as usize) % self.shards.len();

        match self.shards[shard].try_send(job) {
            Ok(()) => {
                let queued = self.metrics.record_queued();
                if queued % STATUS_LOG_EVERY == 0 {
                    self.log_status();
                }
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.metrics.record_dropped();
                self.drop_tracker.record_drop(job.message_count);
                Err(DispatchError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.metrics.record_dropped();
                tracing::warn!(
                    packet = %job.packet_id,
                    "packet dropped: pipeline shutting down"
                );
                Err(DispatchError::QueueClosed)
            }
        }
    }

    /// Packets currently sitting in the queue across all shards.
    pub fn queue_depth(&self) -> usize {
        self.shards
            .iter()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .sum()
    }

    /// Number of worker shards.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.shards.len()
    }

    /// Stop the workers and wait for them to exit.
    ///
    /// Each worker finishes the request it has in flight; whatever is
    /// still queued on its shard is drained into the dropped counter.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().await;
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            packets_received = snapshot.packets_received,
            packets_processed = snapshot.packets_processed,
            packets_dropped = snapshot.packets_dropped,
            messages_processed = snapshot.messages_processed,
            "dispatch pipeline shut down"
        );
    }

    fn log_status(&self) {
        let snapshot = self.metrics.snapshot();
        tracing::info!(
            processed = snapshot.packets_processed,
            dropped = snapshot.packets_dropped,
            total_messages = snapshot.messages_processed,
            msgs_per_sec = format_args!("{:.1}", snapshot.messages_per_second()),
            queue_depth = self.queue_depth(),
            "dispatch status"
        );
    }
}

impl std::fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("workers", &self.shards.len())
            .field("queue_depth", &self.queue_depth())
            .finish()
    }
}

/// One dispatch worker: consumes its shard, performs the POST, settles
/// counters and health state.
struct Worker {
    id: usize,
    rx: mpsc::Receiver<DispatchJob>,
    registry: Arc<AnalyzerRegistry>,
    metrics: Arc<DistributorMetrics>,
    client: AnalyzerClient,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        tracing::debug!(worker = self.id, "dispatch worker starting");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => break,
                },
            }
        }

        // Abandon whatever is still queued on this shard; those packets
        // are lost and must show up in the dropped counter.
        self.rx.close();
        while let Ok(job) = self.rx.try_recv() {
            self.metrics.record_dropped();
            tracing::debug!(
                worker = self.id,
                packet = %job.packet_id,
                "packet abandoned at shutdown"
            );
        }

        tracing::debug!(worker = self.id, "dispatch worker stopping");
    }

    async fn process(&self, job: DispatchJob) {
        let Some(analyzer) = self.registry.get(job.target) else {
            self.metrics.record_dropped();
            tracing::warn!(target = %job.target, "job targets unknown analyzer, dropping");
            return;
        };

        match self.client.post_packet(analyzer.endpoint(), job.body).await {
            Ok(()) => {
                let recovered = analyzer.record_success(job.message_count);
                self.metrics.record_processed(job.message_count);

                if recovered {
                    tracing::info!(
                        analyzer = %analyzer.name(),
                        endpoint = %analyzer.endpoint(),
                        "analyzer recovered after successful delivery"
                    );
                }

                tracing::trace!(
                    packet = %job.packet_id,
                    analyzer = %analyzer.name(),
                    messages = job.message_count,
                    "packet delivered"
                );
            }
            Err(error) => {
                // The packet is lost; never retried here or elsewhere
                self.metrics.record_dropped();
                let went_offline = analyzer.record_failure(now_ms(), self.registry.policy());

                if went_offline {
                    tracing::error!(
                        analyzer = %analyzer.name(),
                        endpoint = %analyzer.endpoint(),
                        failures = analyzer.consecutive_failures(),
                        error = %error,
                        "analyzer taken offline"
                    );
                } else {
                    tracing::warn!(
                        packet = %job.packet_id,
                        analyzer = %analyzer.name(),
                        error = %error,
                        "packet delivery failed"
                    );
                }
            }
        }
    }
}
