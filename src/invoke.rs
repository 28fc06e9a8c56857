//! Argument assembly for one facade operation
//!
//! `OpCall` collects positional values into an [`ArgBuffer`] and keyword
//! values into a dict, applying the operation's coercion table, then runs
//! the dispatcher contract against the owner.

use crate::ops::Op;
use plotbridge_runtime::dispatch::{self, CallDescriptor};
use plotbridge_runtime::marshal::DictBuilder;
use plotbridge_runtime::{
    ArgBuffer, Borrowed, Error, Keywords, Marshaller, Module, Owned, Result, Session, ToForeign,
};

pub(crate) struct OpCall<'s> {
    session: &'s Session<'s>,
    op: Op,
    args: ArgBuffer<'s>,
    kwargs: Option<DictBuilder<'s>>,
}

impl<'s> OpCall<'s> {
    pub(crate) fn new(session: &'s Session<'s>, op: Op) -> Self {
        Self {
            session,
            op,
            args: Marshaller::new(session).args(),
            kwargs: None,
        }
    }

    pub(crate) fn arg<T: ToForeign + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.args.push(value)?;
        Ok(self)
    }

    pub(crate) fn arg_object(mut self, obj: Borrowed<'_, 's>) -> Self {
        self.args.push_borrowed(obj);
        self
    }

    fn dict(&mut self) -> Result<&mut DictBuilder<'s>> {
        let dict = match self.kwargs.take() {
            Some(dict) => dict,
            None => Marshaller::new(self.session).dict()?,
        };
        Ok(self.kwargs.insert(dict))
    }

    /// String options, coerced per the operation's table
    pub(crate) fn keywords(mut self, keywords: &Keywords) -> Result<Self> {
        if !keywords.is_empty() {
            let table = self.op.spec().coercions;
            self.dict()?.extend(keywords, table)?;
        }
        Ok(self)
    }

    pub(crate) fn kwarg<T: ToForeign + ?Sized>(mut self, key: &str, value: &T) -> Result<Self> {
        self.dict()?.set(key, value)?;
        Ok(self)
    }

    pub(crate) fn kwarg_object(mut self, key: &str, obj: Borrowed<'_, 's>) -> Result<Self> {
        self.dict()?.set_object(key, obj)?;
        Ok(self)
    }

    /// Call the operation on `pyplot`
    pub(crate) fn invoke(self) -> Result<Owned<'s>> {
        let session = self.session;
        let pyplot = session.module(Module::Pyplot)?;
        self.invoke_on(pyplot)
    }

    pub(crate) fn invoke_on(self, owner: Borrowed<'_, 's>) -> Result<Owned<'s>> {
        let Self {
            session,
            op,
            args,
            kwargs,
        } = self;
        let args = if args.is_empty() {
            None
        } else {
            Some(args.into_tuple()?)
        };
        let kwargs = kwargs.map(DictBuilder::finish);
        dispatch::call(
            session,
            CallDescriptor::new(op.callable(), owner),
            args.as_ref(),
            kwargs.as_ref(),
        )
    }
}

/// `ArgumentShapeMismatch` unless `found == expected`
pub(crate) fn check_len(operation: &'static str, argument: &'static str, expected: usize, found: usize) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::ArgumentShapeMismatch {
            operation,
            argument,
            expected,
            found,
        })
    }
}
