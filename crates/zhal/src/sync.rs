//! Lock helpers shared by the registries.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

const SYNC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sync");

/// Locks `mutex`, recovering the guard if a panicking thread poisoned it.
///
/// Every structure guarded this way stays consistent between statements, so
/// the data behind a poisoned lock is still usable.
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, name: &'static str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned: PoisonError<MutexGuard<'a, T>>| {
        warn!(target: SYNC_TARGET, lock = name, "recovering poisoned lock");
        poisoned.into_inner()
    })
}
