//! Shared fixtures for unit tests

use parking_lot::{const_mutex, Mutex, MutexGuard};

/// Serializes tests that open the process-wide session
static SESSION_LOCK: Mutex<()> = const_mutex(());

pub(crate) fn lock() -> MutexGuard<'static, ()> {
    SESSION_LOCK.lock()
}
