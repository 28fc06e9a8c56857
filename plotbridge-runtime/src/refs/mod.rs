//! Ownership-typed references to runtime objects
//!
//! Design: The decrement obligation is a value. Whoever holds an [`Owned`]
//! performs exactly one decrement, on drop, whatever the exit path.
//! - [`Owned`] - "new" reference; obligation starts at construction
//! - [`Borrowed`] - no obligation; [`Borrowed::promote`] is the single,
//!   explicit increment that turns it into an `Owned`
//! - [`HandleCell`] - nullable slot holding at most one obligation, with
//!   idempotent release
//!
//! There is no implicit conversion between the two.

mod borrowed;
mod cell;
mod owned;

pub use borrowed::Borrowed;
pub use cell::HandleCell;
pub use owned::Owned;
