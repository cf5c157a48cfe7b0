//! # segmap
//!
//! A concurrent `i64 -> i64` hash map with a choice of locking granularity.
//!
//! ## Backends
//!
//! - [`CoarseMap`]: one reader-writer lock around one hash table. Readers run
//!   in parallel, writers are exclusive against everyone.
//! - [`SegmentedMap`]: the key space is split into independently locked
//!   segments, so writers on different segments never contend.
//!
//! Both implement the same [`ConcurrentMap`] contract. [`Engine`] names the
//! backend chosen at build time (the `segmented` feature selects
//! `SegmentedMap`, otherwise `CoarseMap`), and it is the type behind the
//! C ABI in [`ffi`].
//!
//! ## Quick Start
//!
//! ```rust
//! use segmap::{ConcurrentMap, Engine};
//!
//! let map = Engine::new();
//! map.put(1, 10)?;
//! assert_eq!(map.get(1), Some(10));
//! assert!(!map.put_if_absent(1, 20)?);
//! assert_eq!(map.remove(1), Some(10));
//! assert!(map.is_empty());
//! # Ok::<(), segmap::Error>(())
//! ```
//!
//! ## Thread Safety
//!
//! Every operation takes `&self` and can be called from any number of threads.
//! Values are copied in and out; no reference into map storage outlives a call.
//!
//! ## Failure model
//!
//! A missing key is a normal result, never an error. The only failure is an
//! allocation failure while growing a table; storage is reserved before the
//! table is touched, so a failed mutation leaves the map unchanged.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod ffi;
pub mod map;
pub mod metrics;
mod sync;

pub use crate::map::{
    Backend, CoarseMap, ConcurrentMap, Key, SegmentConfig, SegmentedMap, Value,
    DEFAULT_CAPACITY, DEFAULT_SEGMENT_COUNT,
};
pub use crate::metrics::{MetricsCollector, PerformanceMetrics};

/// The backend linked behind the C ABI, selected at build time.
#[cfg(not(feature = "segmented"))]
pub type Engine = CoarseMap;

/// The backend linked behind the C ABI, selected at build time.
#[cfg(feature = "segmented")]
pub type Engine = SegmentedMap;

/// Which backend [`Engine`] resolves to in this build.
pub const BACKEND: Backend = <Engine as ConcurrentMap>::BACKEND;

/// Error types for segmap operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Growing a table failed; the map was left unchanged
    #[error("allocation failed while growing map storage")]
    AllocationFailed,
    /// A segmented map needs at least one segment
    #[error("segment count must be at least 1, got {0}")]
    InvalidSegmentCount(usize),
}

impl From<hashbrown::TryReserveError> for Error {
    fn from(_: hashbrown::TryReserveError) -> Self {
        Error::AllocationFailed
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::AllocationFailed
    }
}

/// Result type for segmap operations
pub type Result<T> = core::result::Result<T, Error>;
