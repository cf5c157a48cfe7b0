//! C ABI over the build-selected [`Engine`].
//!
//! A map crosses the boundary as an opaque `*mut Engine` handle created by
//! [`segmap_create`] and released exactly once by [`segmap_destroy`].
//!
//! Conventions:
//!
//! - A null handle is accepted everywhere and yields a benign default: `0`,
//!   `false`, or `true` from [`segmap_is_empty`] (a missing map holds
//!   nothing).
//! - [`segmap_get`] returns `0` for a missing key. Use
//!   [`segmap_contains_key`] or [`segmap_get_or_default`] to tell a stored
//!   `0` from absence.
//! - An allocation failure leaves the map unchanged and reports "did not
//!   happen" (`false`, or nothing for [`segmap_put`]).
//! - Panics never unwind across the boundary; they are logged and turned
//!   into the same default.
//!
//! The caller must stop all other threads' use of a handle before
//! destroying it. That precondition is not checked.

use std::ffi::{c_char, CStr};
use std::panic::{self, AssertUnwindSafe};

use crate::{ConcurrentMap, Engine, BACKEND};

/// Run `f` against the map behind `map`, or return `default` for a null
/// handle or a panic.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
unsafe fn with_map<R>(map: *const Engine, op: &str, default: R, f: impl FnOnce(&Engine) -> R) -> R {
    // SAFETY: the caller guarantees `map` is null or live.
    let Some(map) = (unsafe { map.as_ref() }) else {
        return default;
    };
    panic::catch_unwind(AssertUnwindSafe(|| f(map))).unwrap_or_else(|_| {
        log::error!("{op} panicked; returning default");
        default
    })
}

/// Create an empty map. Returns null if it cannot be allocated.
#[no_mangle]
pub extern "C" fn segmap_create() -> *mut Engine {
    match panic::catch_unwind(Engine::try_new) {
        Ok(Ok(map)) => Box::into_raw(Box::new(map)),
        Ok(Err(err)) => {
            log::warn!("segmap_create failed: {err}");
            std::ptr::null_mut()
        }
        Err(_) => {
            log::error!("segmap_create panicked");
            std::ptr::null_mut()
        }
    }
}

/// Destroy a map and free its memory. Null is a no-op.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`] that no other
/// thread is using, and it must not be used again afterwards.
#[no_mangle]
pub unsafe extern "C" fn segmap_destroy(map: *mut Engine) {
    if map.is_null() {
        return;
    }
    // SAFETY: the handle came from `Box::into_raw` and is destroyed once.
    drop(unsafe { Box::from_raw(map) });
}

/// Insert or overwrite `key`.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_put(map: *mut Engine, key: i64, value: i64) {
    unsafe {
        with_map(map, "segmap_put", (), |map| {
            if let Err(err) = map.put(key, value) {
                log::warn!("segmap_put dropped key {key}: {err}");
            }
        })
    }
}

/// Value stored under `key`, or `0` if absent.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_get(map: *const Engine, key: i64) -> i64 {
    unsafe { with_map(map, "segmap_get", 0, |map| map.get(key).unwrap_or(0)) }
}

/// Value stored under `key`, or `default` if absent. A null handle also
/// yields `default`.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_get_or_default(map: *const Engine, key: i64, default: i64) -> i64 {
    unsafe { with_map(map, "segmap_get_or_default", default, |map| map.get_or(key, default)) }
}

/// Whether `key` is present.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_contains_key(map: *const Engine, key: i64) -> bool {
    unsafe { with_map(map, "segmap_contains_key", false, |map| map.contains_key(key)) }
}

/// Remove `key` if present.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_remove(map: *mut Engine, key: i64) {
    unsafe {
        with_map(map, "segmap_remove", (), |map| {
            map.remove(key);
        })
    }
}

/// Insert `key` only if absent. Returns `true` iff this call inserted.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_put_if_absent(map: *mut Engine, key: i64, value: i64) -> bool {
    unsafe {
        with_map(map, "segmap_put_if_absent", false, |map| {
            map.put_if_absent(key, value).unwrap_or_else(|err| {
                log::warn!("segmap_put_if_absent dropped key {key}: {err}");
                false
            })
        })
    }
}

/// Number of entries.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_size(map: *const Engine) -> usize {
    unsafe { with_map(map, "segmap_size", 0, |map| map.len()) }
}

/// Remove every entry.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_clear(map: *mut Engine) {
    unsafe { with_map(map, "segmap_clear", (), |map| map.clear()) }
}

/// Whether the map holds no entries. A null handle reports `true`.
///
/// # Safety
///
/// `map` must be null or a live handle from [`segmap_create`].
#[no_mangle]
pub unsafe extern "C" fn segmap_is_empty(map: *const Engine) -> bool {
    unsafe { with_map(map, "segmap_is_empty", true, |map| map.is_empty()) }
}

const COARSE_NAME: &CStr = c"coarse";
const SEGMENTED_NAME: &CStr = c"segmented";

/// NUL-terminated name of the backend this library was built with
/// (`"coarse"` or `"segmented"`). The string is static; do not free it.
#[no_mangle]
pub extern "C" fn segmap_backend_name() -> *const c_char {
    match BACKEND {
        crate::Backend::Coarse => COARSE_NAME.as_ptr(),
        crate::Backend::Segmented => SEGMENTED_NAME.as_ptr(),
    }
}
