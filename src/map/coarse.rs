//! Coarse-lock backend
//!
//! One reader-writer lock guards one hash table.
//!
//! - `get`, `get_or`, `contains_key`, `len`, `is_empty` lock shared, so any
//!   number of readers proceed together.
//! - `put`, `remove`, `clear` lock exclusively.
//! - `put_if_absent` holds the exclusive lock across the check and the
//!   insert, which makes it atomic by construction.
//!
//! Because every operation goes through the same lock, all operations
//! (including `len` and `clear`) are linearizable.
//!
//! ## Example
//!
//! ```rust
//! use segmap::{CoarseMap, ConcurrentMap};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map = Arc::new(CoarseMap::new());
//!
//! let writer = thread::spawn({
//!     let map = Arc::clone(&map);
//!     move || {
//!         for i in 0..1000 {
//!             map.put(i, i * 2).unwrap();
//!         }
//!     }
//! });
//! writer.join().unwrap();
//!
//! let sum: i64 = (0..1000).filter_map(|i| map.get(i)).sum();
//! assert_eq!(sum, 999_000);
//! ```

use core::fmt;

use crate::map::{self, Backend, ConcurrentMap, Key, Table, Value, DEFAULT_CAPACITY};
use crate::metrics::{MetricsCollector, PerformanceMetrics, Recorder};
use crate::sync::{self, RwLock};
use crate::Result;

/// Concurrent map guarded by a single reader-writer lock
///
/// # Examples
///
/// ```rust
/// use segmap::{CoarseMap, ConcurrentMap};
///
/// let map = CoarseMap::new();
/// assert!(map.put_if_absent(7, 70)?);
/// assert!(!map.put_if_absent(7, 71)?);
/// assert_eq!(map.get(7), Some(70));
/// # Ok::<(), segmap::Error>(())
/// ```
#[derive(Debug)]
pub struct CoarseMap {
    table: RwLock<Table>,
    recorder: Recorder,
}

impl CoarseMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::from_table(Table::default())
    }

    /// Create an empty map with room for `capacity` entries
    ///
    /// Fails with [`Error::AllocationFailed`](crate::Error::AllocationFailed)
    /// if the table cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self::from_table(map::new_table(capacity)?))
    }

    fn from_table(table: Table) -> Self {
        log::debug!("created coarse-lock map (capacity {})", table.capacity());
        Self {
            table: RwLock::new(table),
            recorder: Recorder::default(),
        }
    }

    /// Run `f` against the table under the shared lock.
    #[inline]
    fn read<R>(&self, f: impl FnOnce(&Table) -> R) -> R {
        let op = self.recorder.start();
        let result = f(&sync::read(&self.table, &op));
        op.finish(true);
        result
    }

    /// Run `f` against the table under the exclusive lock.
    #[inline]
    fn write<R>(&self, f: impl FnOnce(&mut Table) -> R) -> R {
        let op = self.recorder.start();
        let result = f(&mut sync::write(&self.table, &op));
        op.finish(true);
        result
    }

    /// Like [`CoarseMap::write`] for mutations that may fail to allocate.
    #[inline]
    fn try_write<R>(&self, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let op = self.recorder.start();
        let result = f(&mut sync::write(&self.table, &op));
        op.finish(result.is_ok());
        result
    }
}

impl Default for CoarseMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentMap for CoarseMap {
    const BACKEND: Backend = Backend::Coarse;

    fn try_new() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    fn put(&self, key: Key, value: Value) -> Result<()> {
        self.try_write(|table| map::put_locked(table, key, value))
    }

    fn get(&self, key: Key) -> Option<Value> {
        self.read(|table| table.get(&key).copied())
    }

    fn get_or(&self, key: Key, default: Value) -> Value {
        self.read(|table| table.get(&key).copied().unwrap_or(default))
    }

    fn contains_key(&self, key: Key) -> bool {
        self.read(|table| table.contains_key(&key))
    }

    fn remove(&self, key: Key) -> Option<Value> {
        self.write(|table| table.remove(&key))
    }

    fn put_if_absent(&self, key: Key, value: Value) -> Result<bool> {
        self.try_write(|table| map::put_if_absent_locked(table, key, value))
    }

    fn len(&self) -> usize {
        self.read(|table| table.len())
    }

    fn is_empty(&self) -> bool {
        self.read(|table| table.is_empty())
    }

    fn clear(&self) {
        self.write(|table| table.clear());
    }
}

impl MetricsCollector for CoarseMap {
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

impl fmt::Display for CoarseMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoarseMap[size={}]", self.len())
    }
}
