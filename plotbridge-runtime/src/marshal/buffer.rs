//! Argument buffer - append-only positional arguments

use super::convert::{list_from_owned, tuple_from_owned, ToForeign};
use crate::error::Result;
use crate::host::Host;
use crate::logging::debug;
use crate::refs::{Borrowed, Owned};

/// Positional arguments accumulated in call order.
///
/// Every pushed value's obligation moves into the buffer. Finalizing
/// consumes the buffer, so it happens at most once; a buffer dropped before
/// finalizing releases everything it holds.
pub struct ArgBuffer<'h> {
    host: &'h dyn Host,
    items: Vec<Owned<'h>>,
}

impl<'h> ArgBuffer<'h> {
    pub(crate) fn new(host: &'h dyn Host) -> Self {
        Self {
            host,
            items: Vec::new(),
        }
    }

    /// Append a converted native value
    pub fn push<T: ToForeign + ?Sized>(&mut self, value: &T) -> Result<&mut Self> {
        let item = value.to_foreign(self.host)?;
        self.items.push(item);
        Ok(self)
    }

    /// By-value form of [`push`](Self::push) for builder chains
    pub fn arg<T: ToForeign + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.push(value)?;
        Ok(self)
    }

    /// Append an object the caller already owns
    pub fn push_owned(&mut self, owned: Owned<'h>) -> &mut Self {
        self.items.push(owned);
        self
    }

    /// Append a borrowed object; the buffer takes its own reference
    pub fn push_borrowed(&mut self, obj: Borrowed<'_, 'h>) -> &mut Self {
        self.items.push(obj.promote());
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finalize into a runtime tuple (positional arguments)
    pub fn into_tuple(mut self) -> Result<Owned<'h>> {
        let items = std::mem::take(&mut self.items);
        tuple_from_owned(self.host, items)
    }

    /// Finalize into a runtime list
    pub fn into_list(mut self) -> Result<Owned<'h>> {
        let items = std::mem::take(&mut self.items);
        list_from_owned(self.host, items)
    }
}

impl Drop for ArgBuffer<'_> {
    fn drop(&mut self) {
        if !self.items.is_empty() {
            debug!(
                target: "plotbridge::marshal",
                released = self.items.len(),
                "argument buffer dropped before finalizing"
            );
        }
    }
}
