//! Concurrent map backends
//!
//! Both backends implement [`ConcurrentMap`] and give identical observable
//! results for every operation; they differ only in how finely they lock.
//!
//! ## Available Maps
//!
//! - [`CoarseMap`]: one reader-writer lock over one table
//! - [`SegmentedMap`]: a fixed array of independently locked segments
//!
//! ## Choosing a Map
//!
//! - Read-dominated or low-contention workloads: `CoarseMap` has the lowest
//!   fixed overhead.
//! - Write-heavy workloads across many keys: `SegmentedMap` bounds contention
//!   to callers that land in the same segment.
//! - `len`, `clear` and `is_empty` on `SegmentedMap` walk the segments one at
//!   a time and are not a single atomic snapshot.

use core::fmt;
use core::hash::BuildHasherDefault;

use crate::{Error, Result};

pub mod coarse;
pub mod segmented;

pub use self::coarse::CoarseMap;
pub use self::segmented::{SegmentConfig, SegmentedMap};

/// Map key
pub type Key = i64;
/// Map value
pub type Value = i64;

/// Initial table capacity used by `new()`
pub const DEFAULT_CAPACITY: usize = 0;
/// Number of segments a [`SegmentedMap`] gets from `new()`
pub const DEFAULT_SEGMENT_COUNT: usize = 16;

/// Sequential table each lock protects.
pub(crate) type Table = hashbrown::HashMap<Key, Value, BuildHasherDefault<fxhash::FxHasher>>;

pub(crate) fn new_table(capacity: usize) -> Result<Table> {
    let mut table = Table::default();
    table.try_reserve(capacity)?;
    Ok(table)
}

/// Make room for one more entry without touching the existing ones.
fn reserve_one(table: &mut Table) -> Result<()> {
    if reserve_fault::take() {
        return Err(Error::AllocationFailed);
    }
    table.try_reserve(1)?;
    Ok(())
}

/// Insert or overwrite `key`, reserving room first so a failed allocation
/// leaves `table` untouched.
pub(crate) fn put_locked(table: &mut Table, key: Key, value: Value) -> Result<()> {
    if let Some(slot) = table.get_mut(&key) {
        *slot = value;
        return Ok(());
    }
    reserve_one(table)?;
    table.insert(key, value);
    Ok(())
}

/// Insert `key` only if it is missing. Returns whether this call inserted.
pub(crate) fn put_if_absent_locked(table: &mut Table, key: Key, value: Value) -> Result<bool> {
    if table.contains_key(&key) {
        return Ok(false);
    }
    reserve_one(table)?;
    table.insert(key, value);
    Ok(true)
}


#[cfg(not(test))]
mod reserve_fault {
    #[inline(always)]
    pub(super) fn take() -> bool {
        false
    }
}

/// Locking strategy behind a map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Single reader-writer lock
    Coarse,
    /// Independently locked segments
    Segmented,
}

impl Backend {
    /// Stable lowercase name, also reported over the C ABI
    pub const fn name(self) -> &'static str {
        match self {
            Backend::Coarse => "coarse",
            Backend::Segmented => "segmented",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The operation contract shared by every backend.
///
/// All methods take `&self` and are safe to call from many threads at once.
/// Per-key operations are linearizable. The aggregate operations (`len`,
/// `is_empty`, `clear`) are exact on [`CoarseMap`] and best-effort on
/// [`SegmentedMap`].
pub trait ConcurrentMap: Send + Sync + Sized {
    /// Which locking strategy this type uses
    const BACKEND: Backend;

    /// Create an empty map, reporting allocation failure instead of aborting
    fn try_new() -> Result<Self>;

    /// Insert `value` under `key`, overwriting any previous value
    fn put(&self, key: Key, value: Value) -> Result<()>;

    /// Value stored under `key`, or `None`
    fn get(&self, key: Key) -> Option<Value>;

    /// Value stored under `key`, or `default`, decided under one lock
    fn get_or(&self, key: Key, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Whether `key` is present
    fn contains_key(&self, key: Key) -> bool;

    /// Remove `key`, returning the value it held
    fn remove(&self, key: Key) -> Option<Value>;

    /// Insert only if `key` is absent. Exactly one of any number of racing
    /// callers on an absent key gets `true`; the rest get `false` and leave
    /// the winner's value in place.
    fn put_if_absent(&self, key: Key, value: Value) -> Result<bool>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Whether the map holds no entries
    fn is_empty(&self) -> bool;

    /// Remove every entry
    fn clear(&self);
}


#[cfg(test)]
mod proptests;
