//! Native ↔ runtime value conversions
//!
//! Numbers keep their nature: integral types become runtime ints (exact),
//! floating types become runtime floats. Nothing is truncated implicitly;
//! integers wider than the runtime's fixed-width entry point are checked.

use crate::error::{Error, Result};
use crate::host::{Host, ObjectKind};
use crate::refs::{Borrowed, Owned};

/// Convert a native value into a new runtime object
pub trait ToForeign {
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>>;
}

/// Read a runtime object back into a native value
pub trait FromForeign: Sized {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self>;
}

macro_rules! float_to_foreign {
    ($($ty:ty),*) => {$(
        impl ToForeign for $ty {
            #[inline]
            fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
                Owned::adopt(host, host.new_float(f64::from(*self)), "creating a float")
            }
        }
    )*};
}

macro_rules! int_to_foreign {
    ($($ty:ty),*) => {$(
        impl ToForeign for $ty {
            #[inline]
            fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
                Owned::adopt(host, host.new_int(i64::from(*self)), "creating an int")
            }
        }
    )*};
}

macro_rules! checked_int_to_foreign {
    ($($ty:ty),*) => {$(
        impl ToForeign for $ty {
            fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
                let value = i64::try_from(*self).map_err(|_| Error::IntegerOverflow {
                    value: self.to_string(),
                })?;
                Owned::adopt(host, host.new_int(value), "creating an int")
            }
        }
    )*};
}

float_to_foreign!(f32, f64);
int_to_foreign!(i8, i16, i32, i64, u8, u16, u32);
checked_int_to_foreign!(u64, usize, isize, i128, u128);

impl ToForeign for bool {
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        // The singletons come back borrowed; promote so that our decrement
        // never eats into the runtime's own reference.
        // SAFETY: the runtime keeps its bool singletons alive while initialized.
        Ok(unsafe { Borrowed::from_raw(host, host.boolean(*self)) }.promote())
    }
}

impl ToForeign for str {
    #[inline]
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        Owned::adopt(host, host.new_str(self), "creating a string")
    }
}

impl ToForeign for String {
    #[inline]
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        self.as_str().to_foreign(host)
    }
}

impl<T: ToForeign + ?Sized> ToForeign for &T {
    #[inline]
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        (**self).to_foreign(host)
    }
}

impl<T: ToForeign> ToForeign for Option<T> {
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        match self {
            Some(value) => value.to_foreign(host),
            // SAFETY: `None` is immortal while the runtime is initialized.
            None => Ok(unsafe { Borrowed::from_raw(host, host.none()) }.promote()),
        }
    }
}

impl<T: ToForeign> ToForeign for [T] {
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        list_from(host, self)
    }
}

impl<T: ToForeign> ToForeign for Vec<T> {
    #[inline]
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        list_from(host, self)
    }
}

impl<T: ToForeign, const N: usize> ToForeign for [T; N] {
    #[inline]
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        list_from(host, self)
    }
}

impl<A: ToForeign, B: ToForeign> ToForeign for (A, B) {
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        let items = [self.0.to_foreign(host)?, self.1.to_foreign(host)?];
        tuple_from_owned(host, items)
    }
}

impl ToForeign for Owned<'_> {
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        host.incref(self.raw());
        Ok(Owned::from_increment(host, self.raw()))
    }
}

impl ToForeign for Borrowed<'_, '_> {
    fn to_foreign<'h>(&self, host: &'h dyn Host) -> Result<Owned<'h>> {
        host.incref(self.raw());
        Ok(Owned::from_increment(host, self.raw()))
    }
}

/// Build a runtime list, converting elementwise.
///
/// Every element is converted before the list exists; a failed conversion
/// releases the elements converted so far.
pub(crate) fn list_from<'h, T: ToForeign>(host: &'h dyn Host, items: &[T]) -> Result<Owned<'h>> {
    let items = items
        .iter()
        .map(|item| item.to_foreign(host))
        .collect::<Result<Vec<_>>>()?;
    list_from_owned(host, items)
}

/// Build a runtime list that takes over the given obligations.
///
/// Each obligation moves into its slot. On failure the partially filled
/// list is released, which releases every element stored so far; the
/// elements not yet stored are released when the iterator drops.
pub(crate) fn list_from_owned<'h, I>(host: &'h dyn Host, items: I) -> Result<Owned<'h>>
where
    I: IntoIterator<Item = Owned<'h>>,
    I::IntoIter: ExactSizeIterator,
{
    let items = items.into_iter();
    let list = Owned::adopt(host, host.new_list(items.len()), "creating a list")?;
    for (index, item) in items.enumerate() {
        if !host.list_set_item(list.raw(), index, item.into_raw()) {
            return Err(Error::invalid_handle("storing a list item", host.take_error()));
        }
    }
    Ok(list)
}

/// Build a runtime tuple that takes over the given obligations
pub(crate) fn tuple_from_owned<'h, I>(host: &'h dyn Host, items: I) -> Result<Owned<'h>>
where
    I: IntoIterator<Item = Owned<'h>>,
    I::IntoIter: ExactSizeIterator,
{
    let items = items.into_iter();
    let tuple = Owned::adopt(host, host.new_tuple(items.len()), "creating a tuple")?;
    for (index, item) in items.enumerate() {
        if !host.tuple_set_item(tuple.raw(), index, item.into_raw()) {
            return Err(Error::invalid_handle("storing a tuple item", host.take_error()));
        }
    }
    Ok(tuple)
}

fn mismatch(expected: &'static str, obj: Borrowed<'_, '_>) -> Error {
    Error::TypeMismatch {
        expected,
        found: obj.kind(),
        reason: None,
    }
}

/// A query the host answered with `None`; its pending error is consumed
fn failed_query(expected: &'static str, obj: Borrowed<'_, '_>) -> Error {
    Error::TypeMismatch {
        expected,
        found: obj.kind(),
        reason: obj.host().take_error(),
    }
}

impl FromForeign for f64 {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self> {
        match obj.kind() {
            ObjectKind::Float | ObjectKind::Int | ObjectKind::Bool => {
                obj.host().as_f64(obj.raw()).ok_or_else(|| failed_query("float", obj))
            }
            _ => Err(mismatch("float", obj)),
        }
    }
}

impl FromForeign for i64 {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self> {
        match obj.kind() {
            ObjectKind::Int | ObjectKind::Bool => {
                obj.host().as_i64(obj.raw()).ok_or_else(|| failed_query("int", obj))
            }
            _ => Err(mismatch("int", obj)),
        }
    }
}

impl FromForeign for bool {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self> {
        obj.host().is_true(obj.raw()).ok_or_else(|| failed_query("truth value", obj))
    }
}

impl FromForeign for String {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self> {
        match obj.kind() {
            ObjectKind::Str => obj.host().as_string(obj.raw()).ok_or_else(|| failed_query("str", obj)),
            _ => Err(mismatch("str", obj)),
        }
    }
}

impl<T: FromForeign> FromForeign for Vec<T> {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self> {
        if !obj.kind().is_sequence() {
            return Err(mismatch("list or tuple", obj));
        }
        (0..obj.len()?)
            .map(|index| obj.item(index)?.borrow().extract())
            .collect()
    }
}

impl<A: FromForeign, B: FromForeign> FromForeign for (A, B) {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self> {
        if !obj.kind().is_sequence() || obj.len()? != 2 {
            return Err(mismatch("pair", obj));
        }
        let first = obj.item(0)?.borrow().extract()?;
        let second = obj.item(1)?.borrow().extract()?;
        Ok((first, second))
    }
}

impl<T: FromForeign> FromForeign for [T; 2] {
    fn from_foreign(obj: Borrowed<'_, '_>) -> Result<Self> {
        let (first, second) = <(T, T)>::from_foreign(obj)?;
        Ok([first, second])
    }
}
