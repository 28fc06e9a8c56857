//! Value marshalling - native values into runtime containers
//!
//! Architecture:
//! - `convert.rs` - `ToForeign`/`FromForeign` per native type
//! - `buffer.rs` - `ArgBuffer`, the append-only positional argument builder
//! - `keywords.rs` - `Keywords`, per-key `Coercion` tables, `DictBuilder`
//!
//! Every operation only allocates new runtime objects. Cross-argument shape
//! (paired x/y lengths and the like) is the caller's precondition and is
//! never checked here.

mod buffer;
mod convert;
mod keywords;

pub use buffer::ArgBuffer;
pub use convert::{FromForeign, ToForeign};
pub use keywords::{coercion_for, keywords, Coercion, CoercionTable, DictBuilder, Keywords};

use crate::error::Result;
use crate::host::Host;
use crate::refs::Owned;
use crate::session::Session;

/// Converts native values for one session
#[derive(Clone, Copy)]
pub struct Marshaller<'s> {
    host: &'s dyn Host,
}

impl<'s> Marshaller<'s> {
    pub fn new(session: &'s Session<'_>) -> Self {
        Self::for_host(session.host())
    }

    pub(crate) fn for_host(host: &'s dyn Host) -> Self {
        Self { host }
    }

    /// Single number, bool or string
    pub fn scalar<T: ToForeign + ?Sized>(&self, value: &T) -> Result<Owned<'s>> {
        value.to_foreign(self.host)
    }

    /// Runtime list of length N, elementwise converted
    pub fn sequence<T: ToForeign>(&self, values: &[T]) -> Result<Owned<'s>> {
        convert::list_from(self.host, values)
    }

    /// Runtime list of runtime lists
    pub fn sequence_of_sequences<T: ToForeign>(&self, rows: &[Vec<T>]) -> Result<Owned<'s>> {
        convert::list_from(self.host, rows)
    }

    /// Runtime dict from string options, coercing the keys `table` names
    pub fn keyword_map(&self, keywords: &Keywords, table: CoercionTable) -> Result<Owned<'s>> {
        let mut dict = self.dict()?;
        dict.extend(keywords, table)?;
        Ok(dict.finish())
    }

    /// Empty positional argument buffer
    pub fn args(&self) -> ArgBuffer<'s> {
        ArgBuffer::new(self.host)
    }

    /// Empty dict for typed keyword values
    pub fn dict(&self) -> Result<DictBuilder<'s>> {
        DictBuilder::new(self.host)
    }

    /// Empty tuple (the positional arguments of a keyword-only call)
    pub fn empty_tuple(&self) -> Result<Owned<'s>> {
        ArgBuffer::new(self.host).into_tuple()
    }
}

#[cfg(test)]
mod tests;
