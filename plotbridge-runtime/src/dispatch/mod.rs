//! Call dispatch - resolve, invoke, read the result
//!
//! Every foreign call follows one contract, tracked as an explicit phase
//! machine:
//!
//! ```text
//! Unresolved --resolve--> Resolved --invoke--> Invoked --> Completed
//!      |                                          |
//!      +----------------> Failed <----------------+
//! ```
//!
//! The dispatcher holds the resolved callable and the call's result, each in
//! its own [`HandleCell`]; both are released exactly once when the
//! dispatcher is dropped. The result is lent out as [`Borrowed`] and only
//! outlives the dispatcher through an explicit promotion.

use crate::error::{Error, Result};
use crate::host::{Host, ObjectKind, RawHandle};
use crate::logging::{debug, debug_span, warn};
use crate::marshal::Marshaller;
use crate::refs::{Borrowed, HandleCell, Owned};
use crate::session::Session;
use smallvec::{smallvec, SmallVec};
use tracing::Span;

/// Lifecycle of one foreign call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Unresolved,
    Resolved,
    Invoked,
    Completed,
    /// Terminal; a failed call is never retried
    Failed,
}

impl Phase {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// What to call: an attribute `name` looked up on `owner`
#[derive(Debug, Clone, Copy)]
pub struct CallDescriptor<'d, 's> {
    pub name: &'d str,
    pub owner: Borrowed<'d, 's>,
}

impl<'d, 's> CallDescriptor<'d, 's> {
    #[inline]
    pub fn new(name: &'d str, owner: Borrowed<'d, 's>) -> Self {
        Self { name, owner }
    }
}

/// Drives one call through its phases
pub struct Dispatcher<'d, 's> {
    session: &'s Session<'s>,
    name: &'d str,
    owner: Borrowed<'d, 's>,
    callable: HandleCell<'s>,
    result: HandleCell<'s>,
    phase: Phase,
    history: SmallVec<[Phase; 4]>,
    span: Span,
}

impl<'d, 's> Dispatcher<'d, 's> {
    pub fn new(session: &'s Session<'s>, descriptor: CallDescriptor<'d, 's>) -> Self {
        Self {
            session,
            name: descriptor.name,
            owner: descriptor.owner,
            callable: HandleCell::empty(),
            result: HandleCell::empty(),
            phase: Phase::Unresolved,
            history: smallvec![Phase::Unresolved],
            span: debug_span!("foreign_call", name = descriptor.name),
        }
    }

    #[inline]
    pub fn name(&self) -> &'d str {
        self.name
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, starting with `Unresolved`
    #[inline]
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    fn transition(&mut self, next: Phase) {
        debug!(target: "plotbridge::dispatch", name = self.name, from = ?self.phase, to = ?next);
        self.phase = next;
        self.history.push(next);
    }

    fn expect_phase(&self, expected: Phase, operation: &'static str) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Look the callable up on its owner. Only valid from `Unresolved`.
    ///
    /// An absent name is [`Error::SymbolNotFound`] and leaves the call
    /// `Failed`.
    pub fn resolve(&mut self) -> Result<()> {
        self.expect_phase(Phase::Unresolved, "resolve")?;
        let span = self.span.clone();
        let _entered = span.enter();

        if let Err(err) = self.session.ensure_live() {
            self.transition(Phase::Failed);
            return Err(err);
        }
        match self.owner.attr(self.name) {
            Ok(callable) => {
                self.callable.replace(Some(callable));
                self.transition(Phase::Resolved);
                Ok(())
            }
            Err(err) => {
                warn!(target: "plotbridge::dispatch", name = self.name, error = %err, "resolve failed");
                self.transition(Phase::Failed);
                Err(err)
            }
        }
    }

    /// Call the resolved callable. Only valid from `Resolved`.
    ///
    /// A missing positional tuple is replaced by an empty one, so every
    /// combination of present/absent arguments is the same runtime call.
    /// Positional arguments other than a tuple, or keywords other than a
    /// dict, are [`Error::TypeMismatch`] and never reach the runtime.
    /// A null result is [`Error::CallFailed`] carrying the runtime's
    /// message.
    ///
    /// The call runs synchronously on the current thread and cannot be
    /// cancelled or timed out; if the runtime blocks, so does the caller.
    pub fn invoke(&mut self, args: Option<&Owned<'s>>, kwargs: Option<&Owned<'s>>) -> Result<()> {
        self.expect_phase(Phase::Resolved, "invoke")?;
        let span = self.span.clone();
        let _entered = span.enter();

        if let Err(err) = self.session.ensure_live() {
            self.transition(Phase::Failed);
            return Err(err);
        }
        let host = self.session.host();
        let Some(callable) = self.callable.get() else {
            self.transition(Phase::Failed);
            return Err(Error::invalid_handle(format!("invoking `{}`", self.name), None));
        };
        let empty;
        let args = match args {
            Some(args) => args.raw(),
            None => match Marshaller::new(self.session).empty_tuple() {
                Ok(tuple) => {
                    empty = tuple;
                    empty.raw()
                }
                Err(err) => {
                    self.transition(Phase::Failed);
                    return Err(err);
                }
            },
        };
        if let Err(err) = check_kind(host, args, ObjectKind::Tuple, "argument tuple")
            .and_then(|()| match kwargs {
                Some(kwargs) => check_kind(host, kwargs.raw(), ObjectKind::Dict, "keyword dict"),
                None => Ok(()),
            })
        {
            warn!(target: "plotbridge::dispatch", name = self.name, error = %err, "rejected call arguments");
            self.transition(Phase::Failed);
            return Err(err);
        }

        self.transition(Phase::Invoked);
        match host.call(callable, args, kwargs.map(Owned::raw)) {
            Some(raw) => {
                self.result.replace(Some(Owned::adopt(host, Some(raw), self.name)?));
                self.transition(Phase::Completed);
                Ok(())
            }
            None => {
                let reason = host.take_error();
                warn!(target: "plotbridge::dispatch", name = self.name, ?reason, "call failed");
                self.transition(Phase::Failed);
                Err(Error::CallFailed {
                    name: self.name.to_string(),
                    reason,
                })
            }
        }
    }

    /// The result, lent for as long as the dispatcher lives
    pub fn result(&self) -> Result<Borrowed<'_, 's>> {
        self.expect_phase(Phase::Completed, "read the result of")?;
        self.result
            .borrow()
            .ok_or_else(|| Error::invalid_handle(format!("reading the result of `{}`", self.name), None))
    }

    /// The result as a new reference that outlives the dispatcher
    pub fn promote_result(&self) -> Result<Owned<'s>> {
        Ok(self.result()?.promote())
    }
}

impl std::fmt::Debug for Dispatcher<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("history", &self.history)
            .finish()
    }
}

fn check_kind(host: &dyn Host, raw: RawHandle, kind: ObjectKind, expected: &'static str) -> Result<()> {
    let found = host.kind(raw);
    if found == kind {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            expected,
            found,
            reason: None,
        })
    }
}

/// Resolve, invoke and promote in one go
pub fn call<'s>(
    session: &'s Session<'s>,
    descriptor: CallDescriptor<'_, 's>,
    args: Option<&Owned<'s>>,
    kwargs: Option<&Owned<'s>>,
) -> Result<Owned<'s>> {
    let mut dispatcher = Dispatcher::new(session, descriptor);
    dispatcher.resolve()?;
    dispatcher.invoke(args, kwargs)?;
    dispatcher.promote_result()
}

#[cfg(test)]
mod tests;
