//! Segmented-lock backend
//!
//! The key space is split into a fixed number of segments at creation. Each
//! segment owns a private table behind a private reader-writer lock, padded
//! to its own cache line so neighbouring segment locks do not false-share.
//!
//! ## Segment selection
//!
//! `segment_of(key) = (fxhash64(key) >> 32) % segment_count`. The high half
//! of the hash picks the segment; the segment's table indexes by the low bits
//! of the same hash, which therefore stay evenly spread inside a segment.
//! Segment membership never changes: there is no segment resize.
//!
//! ## Locking
//!
//! - Per-key operations lock only their own segment, shared for reads and
//!   exclusive for writes. Keys in different segments never contend.
//! - `put_if_absent` checks and inserts under one exclusive segment lock, so
//!   it is as atomic as on the coarse backend, with contention limited to
//!   callers hitting the same segment.
//! - `len`, `is_empty` and `clear` visit every segment, locking one segment at
//!   a time. They never hold two segment locks at once.
//!
//! ## Consistency of aggregate operations
//!
//! `len`, `is_empty` and `clear` are best-effort, not atomic snapshots. If
//! writers race with them, they may observe some segments before and others
//! after a concurrent mutation. A `clear` that completes before another
//! operation starts is still fully visible to that operation.

use core::fmt;

use crossbeam_utils::CachePadded;

use crate::map::{
    self, Backend, ConcurrentMap, Key, Table, Value, DEFAULT_CAPACITY, DEFAULT_SEGMENT_COUNT,
};
use crate::metrics::{MetricsCollector, PerformanceMetrics, Recorder};
use crate::sync::{self, RwLock};
use crate::{Error, Result};

/// Construction parameters for a [`SegmentedMap`]
///
/// # Examples
///
/// ```rust
/// use segmap::{SegmentConfig, SegmentedMap};
///
/// let map = SegmentedMap::with_config(
///     SegmentConfig::new().segment_count(64).capacity(10_000),
/// )?;
/// assert_eq!(map.segment_count(), 64);
/// # Ok::<(), segmap::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    segment_count: usize,
    capacity: usize,
}

impl SegmentConfig {
    /// Default configuration: [`DEFAULT_SEGMENT_COUNT`] segments, no
    /// preallocation
    pub const fn new() -> Self {
        Self {
            segment_count: DEFAULT_SEGMENT_COUNT,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Number of independently locked segments. Must be at least 1; a power
    /// of two sized to the expected parallelism is a good choice.
    pub const fn segment_count(mut self, segment_count: usize) -> Self {
        self.segment_count = segment_count;
        self
    }

    /// Total number of entries to preallocate, spread evenly over segments
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self::new()
    }
}

type Segment = CachePadded<RwLock<Table>>;

/// Concurrent map split into independently locked segments
///
/// # Examples
///
/// ```rust
/// use segmap::{ConcurrentMap, SegmentedMap};
/// use std::sync::Arc;
/// use std::thread;
///
/// let map = Arc::new(SegmentedMap::new());
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let map = Arc::clone(&map);
///         thread::spawn(move || {
///             for i in 0..100 {
///                 map.put(t * 1000 + i, i).unwrap();
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(map.len(), 400);
/// ```
#[derive(Debug)]
pub struct SegmentedMap {
    segments: Box<[Segment]>,
    recorder: Recorder,
}

impl SegmentedMap {
    /// Create an empty map with [`DEFAULT_SEGMENT_COUNT`] segments
    pub fn new() -> Self {
        let segments = (0..DEFAULT_SEGMENT_COUNT)
            .map(|_| CachePadded::new(RwLock::new(Table::default())))
            .collect();
        Self::from_segments(segments, DEFAULT_CAPACITY)
    }

    /// Create an empty map with `segment_count` segments
    pub fn with_segments(segment_count: usize) -> Result<Self> {
        Self::with_config(SegmentConfig::new().segment_count(segment_count))
    }

    /// Create an empty map from `config`
    ///
    /// Fails with [`Error::InvalidSegmentCount`] for zero segments and with
    /// [`Error::AllocationFailed`] if the segment array or any preallocated
    /// table cannot be allocated.
    pub fn with_config(config: SegmentConfig) -> Result<Self> {
        let count = config.segment_count;
        if count == 0 {
            return Err(Error::InvalidSegmentCount(count));
        }

        let per_segment = config.capacity.div_ceil(count);
        let mut segments = Vec::new();
        segments.try_reserve_exact(count)?;
        for _ in 0..count {
            segments.push(CachePadded::new(RwLock::new(map::new_table(per_segment)?)));
        }
        Ok(Self::from_segments(segments.into_boxed_slice(), config.capacity))
    }

    fn from_segments(segments: Box<[Segment]>, capacity: usize) -> Self {
        log::debug!(
            "created segmented-lock map ({} segments, capacity {})",
            segments.len(),
            capacity
        );
        Self {
            segments,
            recorder: Recorder::default(),
        }
    }

    /// Number of segments, fixed for the map's lifetime
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Index of the segment that owns `key`
    #[inline]
    pub fn segment_of(&self, key: Key) -> usize {
        ((fxhash::hash64(&key) >> 32) as usize) % self.segments.len()
    }

    /// Number of entries in one segment, or `None` if `index` is out of range
    pub fn segment_len(&self, index: usize) -> Option<usize> {
        self.segments
            .get(index)
            .map(|segment| segment.read().len())
    }

    #[inline]
    fn segment(&self, key: Key) -> &RwLock<Table> {
        &self.segments[self.segment_of(key)]
    }

    /// Run `f` against `key`'s segment under its shared lock.
    #[inline]
    fn read<R>(&self, key: Key, f: impl FnOnce(&Table) -> R) -> R {
        let op = self.recorder.start();
        let result = f(&sync::read(self.segment(key), &op));
        op.finish(true);
        result
    }

    /// Run `f` against `key`'s segment under its exclusive lock.
    #[inline]
    fn write<R>(&self, key: Key, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let op = self.recorder.start();
        let result = f(&mut sync::write(self.segment(key), &op));
        op.finish(result.is_ok());
        result
    }
}

impl Default for SegmentedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentMap for SegmentedMap {
    const BACKEND: Backend = Backend::Segmented;

    fn try_new() -> Result<Self> {
        Self::with_config(SegmentConfig::new())
    }

    fn put(&self, key: Key, value: Value) -> Result<()> {
        self.write(key, |table| map::put_locked(table, key, value))
    }

    fn get(&self, key: Key) -> Option<Value> {
        self.read(key, |table| table.get(&key).copied())
    }

    fn get_or(&self, key: Key, default: Value) -> Value {
        self.read(key, |table| table.get(&key).copied().unwrap_or(default))
    }

    fn contains_key(&self, key: Key) -> bool {
        self.read(key, |table| table.contains_key(&key))
    }

    fn remove(&self, key: Key) -> Option<Value> {
        let op = self.recorder.start();
        let removed = sync::write(self.segment(key), &op).remove(&key);
        op.finish(true);
        removed
    }

    fn put_if_absent(&self, key: Key, value: Value) -> Result<bool> {
        self.write(key, |table| map::put_if_absent_locked(table, key, value))
    }

    /// Sum of segment sizes, each read under its own lock. Best-effort under
    /// concurrent writers.
    fn len(&self) -> usize {
        let op = self.recorder.start();
        let len = self
            .segments
            .iter()
            .map(|segment| sync::read(segment, &op).len())
            .sum();
        op.finish(true);
        len
    }

    /// Best-effort: `true` means every segment was empty when visited.
    /// Every segment is visited even once a non-empty one has been seen.
    fn is_empty(&self) -> bool {
        let op = self.recorder.start();
        let empty = self.segments.iter().fold(true, |empty, segment| {
            sync::read(segment, &op).is_empty() && empty
        });
        op.finish(true);
        empty
    }

    /// Clear segments in index order, releasing each lock before taking the
    /// next.
    fn clear(&self) {
        let op = self.recorder.start();
        for (index, segment) in self.segments.iter().enumerate() {
            sync::write(segment, &op).clear();
            log::trace!("cleared segment {index}");
        }
        op.finish(true);
    }
}

impl MetricsCollector for SegmentedMap {
    fn metrics(&self) -> PerformanceMetrics {
        self.recorder.snapshot()
    }

    fn reset_metrics(&self) {
        self.recorder.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.recorder.set_enabled(enabled);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.recorder.is_enabled()
    }
}

impl fmt::Display for SegmentedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SegmentedMap[segments={}, size={}]",
            self.segment_count(),
            self.len()
        )
    }
}
