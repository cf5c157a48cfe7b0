//! Operation metrics for the map backends.
//!
//! Every map carries a [`Recorder`]. It is off by default; while off, the
//! only cost on the hot path is one relaxed load. While on, each operation is
//! timed, allocation failures are counted as failed operations, and an
//! operation that had to wait for any of its locks is counted as contended
//! once, however many segments it visited.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of a map's operation metrics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PerformanceMetrics {
    /// Total number of operations recorded
    pub total_operations: u64,
    /// Operations that completed (a missing key still counts as completed)
    pub successful_operations: u64,
    /// Operations that failed to allocate and left the map unchanged
    pub failed_operations: u64,
    /// Operations that had to wait for another thread on at least one lock
    pub contended_operations: u64,
    /// Average operation time in nanoseconds
    pub avg_operation_time_ns: u64,
    /// Maximum operation time in nanoseconds
    pub max_operation_time_ns: u64,
}

impl PerformanceMetrics {
    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        Self::percent(self.successful_operations, self.total_operations)
    }

    /// Contention rate as a percentage, never above 100
    pub fn contention_rate(&self) -> f64 {
        Self::percent(self.contended_operations, self.total_operations)
    }

    /// Failure rate as a percentage
    pub fn failure_rate(&self) -> f64 {
        Self::percent(self.failed_operations, self.total_operations)
    }

    /// Average operation time as a `Duration`
    pub fn avg_operation_time(&self) -> Duration {
        Duration::from_nanos(self.avg_operation_time_ns)
    }

    /// Maximum operation time as a `Duration`
    pub fn max_operation_time(&self) -> Duration {
        Duration::from_nanos(self.max_operation_time_ns)
    }

    fn percent(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}

/// Data structures that expose operation metrics
pub trait MetricsCollector {
    /// Current metrics snapshot
    fn metrics(&self) -> PerformanceMetrics;

    /// Reset all counters to zero
    fn reset_metrics(&self);

    /// Turn metrics collection on or off
    fn set_metrics_enabled(&self, enabled: bool);

    /// Whether metrics collection is on
    fn is_metrics_enabled(&self) -> bool;
}

#[derive(Debug, Default)]
struct AtomicMetrics {
    total_operations: AtomicU64,
    successful_operations: AtomicU64,
    failed_operations: AtomicU64,
    contended_operations: AtomicU64,
    total_time_ns: AtomicU64,
    max_time_ns: AtomicU64,
}

/// Per-map metrics state shared by both backends.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    metrics: AtomicMetrics,
    enabled: AtomicBool,
}

impl Recorder {
    #[inline]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Start an operation. While disabled the returned handle records nothing.
    #[inline]
    pub(crate) fn start(&self) -> Operation<'_> {
        Operation {
            recorder: self,
            started: self.is_enabled().then(Instant::now),
            contended: Cell::new(false),
        }
    }

    fn record_success(&self, duration: Duration) {
        let m = &self.metrics;
        let duration_ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        m.total_operations.fetch_add(1, Ordering::Relaxed);
        m.successful_operations.fetch_add(1, Ordering::Relaxed);
        m.total_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        m.max_time_ns.fetch_max(duration_ns, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.metrics.total_operations.fetch_add(1, Ordering::Relaxed);
        self.metrics.failed_operations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_contention(&self) {
        self.metrics
            .contended_operations
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PerformanceMetrics {
        let m = &self.metrics;
        let total = m.total_operations.load(Ordering::Relaxed);
        let total_time = m.total_time_ns.load(Ordering::Relaxed);
        let successful = m.successful_operations.load(Ordering::Relaxed);

        PerformanceMetrics {
            total_operations: total,
            successful_operations: successful,
            failed_operations: m.failed_operations.load(Ordering::Relaxed),
            contended_operations: m.contended_operations.load(Ordering::Relaxed),
            avg_operation_time_ns: if successful > 0 { total_time / successful } else { 0 },
            max_operation_time_ns: m.max_time_ns.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        let m = &self.metrics;
        m.total_operations.store(0, Ordering::Relaxed);
        m.successful_operations.store(0, Ordering::Relaxed);
        m.failed_operations.store(0, Ordering::Relaxed);
        m.contended_operations.store(0, Ordering::Relaxed);
        m.total_time_ns.store(0, Ordering::Relaxed);
        m.max_time_ns.store(0, Ordering::Relaxed);
    }
}

/// One in-flight operation on a map.
#[derive(Debug)]
pub(crate) struct Operation<'a> {
    recorder: &'a Recorder,
    started: Option<Instant>,
    contended: Cell<bool>,
}

impl Operation<'_> {
    /// Whether this operation is being recorded.
    #[inline]
    pub(crate) fn is_recording(&self) -> bool {
        self.started.is_some()
    }

    /// Note that a lock had to be waited for. Repeated calls count once.
    #[inline]
    pub(crate) fn mark_contended(&self) {
        self.contended.set(true);
    }

    #[inline]
    pub(crate) fn finish(self, succeeded: bool) {
        let Some(started) = self.started else {
            return;
        };
        if self.contended.get() {
            self.recorder.record_contention();
        }
        if succeeded {
            self.recorder.record_success(started.elapsed());
        } else {
            self.recorder.record_failure();
        }
    }
}
