//! Lock primitives used by the map backends.
//!
//! Normal builds use `parking_lot`. Under `--cfg loom` the same API is backed
//! by loom's model-checked `RwLock`, so the real backends can be explored
//! exhaustively by the loom tests.

use crate::metrics::Operation;

#[cfg(not(loom))]
pub(crate) use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(loom)]
pub(crate) use self::loom_lock::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(loom)]
mod loom_lock {
    use std::sync::PoisonError;

    pub(crate) use loom::sync::{RwLockReadGuard, RwLockWriteGuard};

    /// `parking_lot`-shaped wrapper over loom's lock. Poisoning is ignored,
    /// matching `parking_lot`.
    #[derive(Debug)]
    pub(crate) struct RwLock<T>(loom::sync::RwLock<T>);

    impl<T> RwLock<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::RwLock::new(value))
        }

        pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
            self.0.read().unwrap_or_else(PoisonError::into_inner)
        }

        pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
            self.0.write().unwrap_or_else(PoisonError::into_inner)
        }

        pub(crate) fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
            self.0.try_read().ok()
        }

        pub(crate) fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
            self.0.try_write().ok()
        }
    }
}

/// Acquire `lock` shared on behalf of `op`. When `op` is being recorded, a
/// failed first attempt marks it contended before falling back to a blocking
/// acquire.
#[inline]
pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, op: &Operation<'_>) -> RwLockReadGuard<'a, T> {
    if !op.is_recording() {
        return lock.read();
    }
    match lock.try_read() {
        Some(guard) => guard,
        None => {
            op.mark_contended();
            lock.read()
        }
    }
}

/// Acquire `lock` exclusively, counting contention like [`read`].
#[inline]
pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, op: &Operation<'_>) -> RwLockWriteGuard<'a, T> {
    if !op.is_recording() {
        return lock.write();
    }
    match lock.try_write() {
        Some(guard) => guard,
        None => {
            op.mark_contended();
            lock.write()
        }
    }
}
