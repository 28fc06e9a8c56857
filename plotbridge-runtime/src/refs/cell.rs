//! Reference cell - nullable slot holding at most one obligation

use super::{Borrowed, Owned};
use crate::error::{Error, Result};
use crate::host::{Host, RawHandle};

/// Holds zero or one runtime reference.
///
/// An empty cell stands for "absent" (a null handle). Dropping, releasing or
/// replacing a present cell performs exactly one decrement; doing so again
/// on the now-empty cell is a no-op.
#[derive(Debug, Default)]
pub struct HandleCell<'h> {
    slot: Option<Owned<'h>>,
}

impl<'h> HandleCell<'h> {
    #[inline]
    pub const fn empty() -> Self {
        Self { slot: None }
    }

    #[inline]
    pub fn from_owned(owned: Owned<'h>) -> Self {
        Self { slot: Some(owned) }
    }

    /// Wrap a "new" reference: no increment, the obligation starts here.
    /// A null handle yields an empty cell.
    ///
    /// # Safety
    /// Same as [`Owned::from_new`] for a present handle.
    pub unsafe fn from_new(host: &'h dyn Host, raw: Option<RawHandle>) -> Self {
        Self {
            slot: raw.and_then(|raw| Owned::from_new(host, Some(raw), "wrapping a new reference").ok()),
        }
    }

    /// Wrap a borrowed reference: one increment creates the cell's own
    /// obligation, leaving the source's untouched. A null handle yields an
    /// empty cell.
    ///
    /// # Safety
    /// A present `raw` must be a live object of `host`.
    pub unsafe fn from_borrowed(host: &'h dyn Host, raw: Option<RawHandle>) -> Self {
        Self {
            slot: raw.map(|raw| Borrowed::from_raw(host, raw).promote()),
        }
    }

    /// Read-only view of the handle; ownership is neither moved nor duplicated
    #[inline]
    pub fn get(&self) -> Option<RawHandle> {
        self.slot.as_ref().map(Owned::raw)
    }

    /// Truthiness: `true` when a handle is held
    #[inline]
    pub fn is_present(&self) -> bool {
        self.slot.is_some()
    }

    #[inline]
    pub fn borrow(&self) -> Option<Borrowed<'_, 'h>> {
        self.slot.as_ref().map(Owned::borrow)
    }

    pub fn refcount(&self) -> usize {
        self.slot.as_ref().map_or(0, Owned::refcount)
    }

    /// Perform the pending decrement, if any. Returns whether one happened.
    pub fn release(&mut self) -> bool {
        self.slot.take().is_some()
    }

    /// Store `owned`, releasing the previous occupant exactly once
    pub fn replace(&mut self, owned: Option<Owned<'h>>) -> bool {
        let released = self.release();
        self.slot = owned;
        released
    }

    /// Move the obligation out, leaving the cell empty
    #[inline]
    pub fn take(&mut self) -> Option<Owned<'h>> {
        self.slot.take()
    }

    /// Non-nullable view: an empty cell is [`Error::InvalidHandle`]
    pub fn require(self, context: &str) -> Result<Owned<'h>> {
        self.slot.ok_or_else(|| Error::invalid_handle(context, None))
    }
}

impl<'h> From<Owned<'h>> for HandleCell<'h> {
    fn from(owned: Owned<'h>) -> Self {
        Self::from_owned(owned)
    }
}
