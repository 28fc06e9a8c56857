//! Host - the opaque dynamic-object runtime behind the boundary
//!
//! Design: A thin, C-API shaped trait. Every method mirrors one runtime
//! entry point and reports failure the way the runtime does (a missing
//! handle plus a pending error retrievable with [`Host::take_error`]).
//! Ownership is NOT expressed here; the typed layer in [`crate::refs`] is
//! what decides who carries each decrement obligation.
//!
//! Implementations:
//! - [`RecordingHost`] - in-process reference-counted object heap with a
//!   headless plotting module that records every call
//! - `PythonHost` - CPython through `pyo3::ffi` (feature `python`)

mod recording;
#[cfg(feature = "python")]
mod python;

pub use recording::{CallRecord, RecordingHost};
#[cfg(feature = "python")]
pub use python::PythonHost;

use core::fmt;
use core::num::NonZeroUsize;

/// Opaque, non-null address of a runtime object.
///
/// Never dereferenced by the boundary layer; only handed back to the
/// [`Host`] that produced it. Nullable handles are `Option<RawHandle>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    #[inline]
    pub const fn from_addr(addr: NonZeroUsize) -> Self {
        Self(addr)
    }

    /// Wrap a runtime pointer; `None` for null
    #[inline]
    pub fn from_ptr<T>(ptr: *mut T) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    /// # Safety
    /// `ptr` must be non-null.
    #[inline]
    pub unsafe fn from_ptr_unchecked<T>(ptr: *mut T) -> Self {
        Self(NonZeroUsize::new_unchecked(ptr as usize))
    }

    #[inline]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0.get() as *mut T
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.0.get())
    }
}

/// Coarse runtime type of an object, used for read-back and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    None,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Dict,
    Module,
    Callable,
    Other,
}

impl ObjectKind {
    #[inline]
    pub const fn is_sequence(self) -> bool {
        matches!(self, Self::List | Self::Tuple)
    }
}

/// Runtime entry points used by the boundary layer.
///
/// # Contract
/// - Methods documented as returning a *new* reference hand the caller one
///   decrement obligation; *borrowed* results carry none.
/// - `list_set_item`/`tuple_set_item` steal the item's reference, even on
///   failure. `dict_set_item` does not steal.
/// - Handles passed in must be live objects of this host.
/// - `None` results leave an error pending until [`Host::take_error`].
pub trait Host {
    /// Short name for diagnostics ("recording", "cpython")
    fn name(&self) -> &str;

    /// Start the runtime. Called once per session that owns the runtime.
    fn initialize(&self) -> Result<(), String>;

    /// Shut the runtime down. Safe to call when not initialized.
    fn finalize(&self);

    fn is_initialized(&self) -> bool;

    fn incref(&self, obj: RawHandle);

    fn decref(&self, obj: RawHandle);

    /// Current reference count (0 for objects the host no longer knows)
    fn refcount(&self, obj: RawHandle) -> usize;

    /// The `None` singleton (borrowed)
    fn none(&self) -> RawHandle;

    /// The `True`/`False` singleton (borrowed)
    fn boolean(&self, value: bool) -> RawHandle;

    /// New reference
    fn new_float(&self, value: f64) -> Option<RawHandle>;

    /// New reference
    fn new_int(&self, value: i64) -> Option<RawHandle>;

    /// New reference
    fn new_str(&self, value: &str) -> Option<RawHandle>;

    /// New reference to a list of `len` empty slots
    fn new_list(&self, len: usize) -> Option<RawHandle>;

    /// New reference to a tuple of `len` empty slots
    fn new_tuple(&self, len: usize) -> Option<RawHandle>;

    /// New reference
    fn new_dict(&self) -> Option<RawHandle>;

    /// Store `item` at `index`; steals `item`
    fn list_set_item(&self, list: RawHandle, index: usize, item: RawHandle) -> bool;

    /// Store `item` at `index`; steals `item`
    fn tuple_set_item(&self, tuple: RawHandle, index: usize, item: RawHandle) -> bool;

    /// `dict[key] = value`; does not steal `value`
    fn dict_set_item(&self, dict: RawHandle, key: &str, value: RawHandle) -> bool;

    /// Import a module by dotted name; new reference
    fn import(&self, module: &str) -> Option<RawHandle>;

    /// Attribute lookup; new reference
    fn get_attr(&self, owner: RawHandle, name: &str) -> Option<RawHandle>;

    /// Invoke `callable(*args, **kwargs)`; `args` must be a tuple. New reference.
    fn call(&self, callable: RawHandle, args: RawHandle, kwargs: Option<RawHandle>) -> Option<RawHandle>;

    /// `container[index]`; new reference
    fn get_item(&self, container: RawHandle, index: isize) -> Option<RawHandle>;

    /// Length of a sized object
    fn size(&self, obj: RawHandle) -> Option<usize>;

    fn kind(&self, obj: RawHandle) -> ObjectKind;

    fn as_f64(&self, obj: RawHandle) -> Option<f64>;

    fn as_i64(&self, obj: RawHandle) -> Option<i64>;

    fn as_string(&self, obj: RawHandle) -> Option<String>;

    /// Truthiness, `None` when the runtime raised
    fn is_true(&self, obj: RawHandle) -> Option<bool>;

    /// Fetch and clear the pending runtime error, rendered as `Type: message`
    fn take_error(&self) -> Option<String>;
}
