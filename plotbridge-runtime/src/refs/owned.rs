//! Owned reference - carries exactly one decrement obligation

use super::Borrowed;
use crate::error::{Error, Result};
use crate::host::{Host, ObjectKind, RawHandle};
use crate::logging::trace;
use core::fmt;

/// A runtime object whose decrement obligation this value carries.
///
/// Drop performs the decrement. `Clone` performs an increment and yields a
/// second, independent obligation. The `'h` lifetime ties the reference to
/// the host (in practice: the session) it belongs to.
pub struct Owned<'h> {
    host: &'h dyn Host,
    raw: RawHandle,
}

impl<'h> Owned<'h> {
    /// Take over a new reference returned by the runtime.
    ///
    /// A null handle is reported as [`Error::InvalidHandle`], carrying the
    /// runtime's pending error if there is one.
    ///
    /// # Safety
    /// `raw`, when present, must be a live object of `host`, and the caller
    /// must own one reference to it that it has not released or handed
    /// elsewhere. That reference moves into the returned value.
    pub unsafe fn from_new(host: &'h dyn Host, raw: Option<RawHandle>, context: &str) -> Result<Self> {
        match raw {
            Some(raw) => {
                trace!(target: "plotbridge::refcount", event = "adopt", handle = ?raw);
                Ok(Self { host, raw })
            }
            None => Err(Error::invalid_handle(context, host.take_error())),
        }
    }

    /// Adopt the result of a host entry point documented to return a new
    /// reference.
    #[inline]
    pub(crate) fn adopt(host: &'h dyn Host, raw: Option<RawHandle>, context: &str) -> Result<Self> {
        // SAFETY: only called directly on `Host` methods whose contract
        // returns a new reference.
        unsafe { Self::from_new(host, raw, context) }
    }

    /// Wrap a handle whose reference the caller has just created with an increment
    #[inline]
    pub(crate) fn from_increment(host: &'h dyn Host, raw: RawHandle) -> Self {
        Self { host, raw }
    }

    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    #[inline]
    pub fn host(&self) -> &'h dyn Host {
        self.host
    }

    /// Borrow without touching the count
    #[inline]
    pub fn borrow(&self) -> Borrowed<'_, 'h> {
        // SAFETY: `self` keeps the object alive for the borrow's lifetime.
        unsafe { Borrowed::from_raw(self.host, self.raw) }
    }

    #[inline]
    pub fn refcount(&self) -> usize {
        self.host.refcount(self.raw)
    }

    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.host.kind(self.raw)
    }

    /// Give up the obligation without decrementing, e.g. to a container slot
    /// that steals the reference.
    #[inline]
    pub fn into_raw(self) -> RawHandle {
        let raw = self.raw;
        trace!(target: "plotbridge::refcount", event = "transfer", handle = ?raw);
        core::mem::forget(self);
        raw
    }
}

impl Clone for Owned<'_> {
    fn clone(&self) -> Self {
        self.host.incref(self.raw);
        trace!(target: "plotbridge::refcount", event = "incref", handle = ?self.raw);
        Self {
            host: self.host,
            raw: self.raw,
        }
    }
}

impl Drop for Owned<'_> {
    fn drop(&mut self) {
        trace!(target: "plotbridge::refcount", event = "decref", handle = ?self.raw);
        self.host.decref(self.raw);
    }
}

impl fmt::Debug for Owned<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("raw", &self.raw)
            .field("host", &self.host.name())
            .finish()
    }
}
