#![allow(dead_code)]

use parking_lot::{const_mutex, Mutex, MutexGuard};
use plotbridge::{RecordingHost, Session, SessionOptions};

/// Only one session may be live per process; tests that open one hold this.
static SESSION_LOCK: Mutex<()> = const_mutex(());

pub fn lock() -> MutexGuard<'static, ()> {
    SESSION_LOCK.lock()
}

pub fn open(host: &RecordingHost) -> Session<'_> {
    Session::open(host, &SessionOptions::default()).unwrap()
}
