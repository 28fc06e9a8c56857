//! Borrowed reference - no obligation, explicit promotion

use super::Owned;
use crate::error::{Error, Result};
use crate::host::{Host, ObjectKind, RawHandle};
use crate::logging::trace;
use crate::marshal::FromForeign;
use core::fmt;
use core::marker::PhantomData;

/// A runtime object kept alive by someone else for at least `'b`.
///
/// Copying a `Borrowed` never touches the reference count. The only way to
/// keep the object beyond `'b` is [`Borrowed::promote`].
#[derive(Clone, Copy)]
pub struct Borrowed<'b, 'h> {
    host: &'h dyn Host,
    raw: RawHandle,
    _source: PhantomData<&'b ()>,
}

impl<'b, 'h> Borrowed<'b, 'h> {
    /// # Safety
    /// `raw` must be a live object of `host` that stays alive for `'b`.
    #[inline]
    pub unsafe fn from_raw(host: &'h dyn Host, raw: RawHandle) -> Self {
        Self {
            host,
            raw,
            _source: PhantomData,
        }
    }

    #[inline]
    pub fn raw(self) -> RawHandle {
        self.raw
    }

    #[inline]
    pub fn host(self) -> &'h dyn Host {
        self.host
    }

    /// Borrowed → owned: performs one increment and returns the new obligation
    #[must_use = "dropping the promoted reference releases it immediately"]
    pub fn promote(self) -> Owned<'h> {
        self.host.incref(self.raw);
        trace!(target: "plotbridge::refcount", event = "promote", handle = ?self.raw);
        Owned::from_increment(self.host, self.raw)
    }

    #[inline]
    pub fn refcount(self) -> usize {
        self.host.refcount(self.raw)
    }

    #[inline]
    pub fn kind(self) -> ObjectKind {
        self.host.kind(self.raw)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.kind() == ObjectKind::None
    }

    /// Length of a sized object. A failed query consumes the runtime's
    /// pending error into [`Error::TypeMismatch`].
    pub fn len(self) -> Result<usize> {
        self.host.size(self.raw).ok_or_else(|| Error::TypeMismatch {
            expected: "sized object",
            found: self.kind(),
            reason: self.host.take_error(),
        })
    }

    pub fn is_empty(self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// `self[index]` as a new reference
    pub fn item(self, index: usize) -> Result<Owned<'h>> {
        let index = isize::try_from(index).map_err(|_| Error::IntegerOverflow {
            value: index.to_string(),
        })?;
        Owned::adopt(self.host, self.host.get_item(self.raw, index), "reading a container item")
    }

    /// Attribute lookup as a new reference
    pub fn attr(self, name: &str) -> Result<Owned<'h>> {
        match self.host.get_attr(self.raw, name) {
            // SAFETY: `get_attr` returns a new reference.
            Some(raw) => unsafe { Owned::from_new(self.host, Some(raw), name) },
            None => Err(Error::SymbolNotFound {
                name: name.to_string(),
                reason: self.host.take_error(),
            }),
        }
    }

    /// Read the object back into a native value
    pub fn extract<T: FromForeign>(self) -> Result<T> {
        T::from_foreign(self)
    }
}

impl fmt::Debug for Borrowed<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Borrowed")
            .field("raw", &self.raw)
            .field("host", &self.host.name())
            .finish()
    }
}
