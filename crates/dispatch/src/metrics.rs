//! Process-wide distribution counters
//!
//! Atomic counters for the packet lifecycle and the delivered-message
//! total. All operations use relaxed ordering; values are eventually
//! consistent, which every reader (selector, stats endpoint) tolerates.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for the distributor.
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently. A
/// reader never observes any individual counter decreasing.
#[derive(Debug)]
pub struct DistributorMetrics {
    /// Well-formed packets accepted at the ingest boundary
    packets_received: AtomicU64,

    /// Packets successfully placed on the dispatch queue
    packets_queued: AtomicU64,

    /// Packets delivered to an analyzer (2xx response)
    packets_processed: AtomicU64,

    /// Packets lost: no target, queue overflow, delivery failure, or
    /// abandoned at shutdown
    packets_dropped: AtomicU64,

    /// Messages delivered across all analyzers; equals the sum of the
    /// per-analyzer counts at any quiescent point
    messages_processed: AtomicU64,

    /// Process start, epoch milliseconds (for rate computation)
    started_ms: u64,
}

impl Default for DistributorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DistributorMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            packets_queued: AtomicU64::new(0),
            packets_processed: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            messages_processed: AtomicU64::new(0),
            started_ms: splay_registry::now_ms(),
        }
    }

    /// Record a well-formed packet arriving at the ingest boundary.
    #[inline]
    pub fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a packet placed on the dispatch queue.
    ///
    /// Returns the new queued total (used for periodic status logging).
    #[inline]
    pub fn record_queued(&self) -> u64 {
        self.packets_queued.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a successful delivery of a packet carrying `messages`
    /// messages.
    #[inline]
    pub fn record_processed(&self, messages: u64) {
        self.packets_processed.fetch_add(1, Ordering::Relaxed);
        self.messages_processed.fetch_add(messages, Ordering::Relaxed);
    }

    /// Record a lost packet (no target, overflow, failed send, abandoned).
    #[inline]
    pub fn record_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Delivered-message total - the selector's denominator.
    #[inline]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    /// Packets dropped so far.
    #[inline]
    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_queued: self.packets_queued.load(Ordering::Relaxed),
            packets_processed: self.packets_processed.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            uptime_ms: splay_registry::now_ms().saturating_sub(self.started_ms),
        }
    }
}

/// Point-in-time snapshot of the distributor counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Well-formed packets accepted at ingest
    pub packets_received: u64,
    /// Packets placed on the dispatch queue
    pub packets_queued: u64,
    /// Packets delivered (2xx)
    pub packets_processed: u64,
    /// Packets lost
    pub packets_dropped: u64,
    /// Messages delivered across all analyzers
    pub messages_processed: u64,
    /// Milliseconds since process start
    pub uptime_ms: u64,
}

impl MetricsSnapshot {
    /// Packets accepted but neither delivered nor dropped yet.
    #[inline]
    pub fn packets_in_flight(&self) -> u64 {
        self.packets_received
            .saturating_sub(self.packets_processed + self.packets_dropped)
    }

    /// Delivered packets per second since process start.
    #[inline]
    pub fn packets_per_second(&self) -> f64 {
        if self.uptime_ms == 0 {
            return 0.0;
        }
        (self.packets_processed as f64 * 1000.0) / self.uptime_ms as f64
    }

    /// Delivered messages per second since process start.
    #[inline]
    pub fn messages_per_second(&self) -> f64 {
        if self.uptime_ms == 0 {
            return 0.0;
        }
        (self.messages_processed as f64 * 1000.0) / self.uptime_ms as f64
    }

    /// Fraction of received packets that were lost (0.0 - 1.0).
    #[inline]
    pub fn error_rate(&self) -> f64 {
        if self.packets_received == 0 {
            return 0.0;
        }
        self.packets_dropped as f64 / self.packets_received as f64
    }
}

// ============================================================================
// Drop Tracker - Rate-limited logging for production visibility
// ============================================================================

/// Rate-limited drop logging.
///
/// Aggregates drop events and logs a summary every second instead of
/// per-event logging, so overflow under load does not flood the log while
/// operators still see it.
///
/// # Thresholds
///
/// - >0 drops/sec: WARN level
/// - >100 drops/sec: ERROR level (sustained overload)
#[derive(Debug)]
pub struct DropTracker {
    /// Drops in the current interval
    interval_drops: AtomicU64,
    /// Messages lost in the current interval
    interval_messages: AtomicU64,
    /// Last log time (epoch milliseconds)
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;
/// Drops/sec that escalates the summary to ERROR level
const CRITICAL_DROP_THRESHOLD: u64 = 100;

impl DropTracker {
    /// Create a new tracker.
    pub fn new() -> Self {
        Self {
            interval_drops: AtomicU64::new(0),
            interval_messages: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(splay_registry::now_ms()),
        }
    }

    /// Record a dropped packet carrying `messages` messages.
    ///
    /// Returns true if a summary log was emitted.
    pub fn record_drop(&self, messages: u64) -> bool {
        self.interval_drops.fetch_add(1, Ordering::Relaxed);
        self.interval_messages.fetch_add(messages, Ordering::Relaxed);

        self.maybe_log()
    }

    fn maybe_log(&self) -> bool {
        let now = splay_registry::now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);

        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Claim the log slot so concurrent callers emit a single summary
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let drops = self.interval_drops.swap(0, Ordering::Relaxed);
        let messages = self.interval_messages.swap(0, Ordering::Relaxed);

        if drops == 0 {
            return false;
        }

        if drops > CRITICAL_DROP_THRESHOLD {
            tracing::error!(
                dropped_packets = drops,
                dropped_messages = messages,
                threshold = CRITICAL_DROP_THRESHOLD,
                "CRITICAL: high drop rate - dispatch cannot keep up"
            );
        } else {
            tracing::warn!(
                dropped_packets = drops,
                dropped_messages = messages,
                "packets dropped in last second"
            );
        }

        true
    }

    /// Get the current interval drop count (for testing).
    #[cfg(test)]
    pub fn current_drops(&self) -> u64 {
        self.interval_drops.load(Ordering::Relaxed)
    }
}

impl Default for DropTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // DistributorMetrics Tests
    // ========================================================================

    #[test]
    fn test_metrics_new() {
        let metrics = DistributorMetrics::new();
        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.packets_received, 0);
        assert_eq!(snapshot.packets_queued, 0);
        assert_eq!(snapshot.packets_processed, 0);
        assert_eq!(snapshot.packets_dropped, 0);
        assert_eq!(snapshot.messages_processed, 0);
    }

    #[test]
    fn test_record_lifecycle() {
        let metrics = DistributorMetrics::new();

        metrics.record_received();
        metrics.record_received();
        assert_eq!(metrics.record_queued(), 1);
        assert_eq!(metrics.record_queued(), 2);
        metrics.record_processed(15);
        metrics.record_dropped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_received, 2);
        assert_eq!(snapshot.packets_queued, 2);
        assert_eq!(snapshot.packets_processed, 1);
        assert_eq!(snapshot.packets_dropped, 1);
        assert_eq!(snapshot.messages_processed, 15);
        assert_eq!(snapshot.packets_in_flight(), 0);
    }

    #[test]
    fn test_in_flight_accounting() {
        let metrics = DistributorMetrics::new();

        for _ in 0..10 {
            metrics.record_received();
            metrics.record_queued();
        }
        metrics.record_processed(4);
        metrics.record_processed(2);
        metrics.record_dropped();

        assert_eq!(metrics.snapshot().packets_in_flight(), 7);
    }

    #[test]
    fn test_error_rate() {
        let metrics = DistributorMetrics::new();
        assert_eq!(metrics.snapshot().error_rate(), 0.0);

        for _ in 0..10 {
            metrics.record_received();
        }
        metrics.record_dropped();
        metrics.record_dropped();

        assert!((metrics.snapshot().error_rate() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_rates_zero_at_zero_uptime() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.packets_per_second(), 0.0);
        assert_eq!(snapshot.messages_per_second(), 0.0);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(DistributorMetrics::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..1_000 {
                    m.record_received();
                    m.record_queued();
                    m.record_processed(5);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_received, 4_000);
        assert_eq!(snapshot.packets_processed, 4_000);
        assert_eq!(snapshot.messages_processed, 20_000);
    }

    // ========================================================================
    // DropTracker Tests
    // ========================================================================

    #[test]
    fn test_drop_tracker_new() {
        let tracker = DropTracker::new();
        assert_eq!(tracker.current_drops(), 0);
    }

    #[test]
    fn test_drop_tracker_accumulates() {
        let tracker = DropTracker::new();

        // Within the first interval nothing is logged yet
        tracker.record_drop(10);
        tracker.record_drop(20);

        assert_eq!(tracker.current_drops(), 2);
    }
}
