//! CPython host through the raw `pyo3::ffi` bindings
//!
//! Every method maps to one C-API entry point with the same ownership
//! convention, so the typed layer above sees exactly what the interpreter
//! does. The interpreter is driven from the thread that initialized it,
//! which holds the GIL for the whole session.

use super::{Host, ObjectKind, RawHandle};
use crate::logging::warn;
use core::marker::PhantomData;
use pyo3::ffi;
use std::ffi::{c_char, CString};
use std::ptr;

/// Embedded CPython interpreter
#[derive(Debug, Default)]
pub struct PythonHost {
    // Pins the host to the interpreter's thread.
    _thread: PhantomData<*const ()>,
}

impl PythonHost {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn ptr(obj: RawHandle) -> *mut ffi::PyObject {
        obj.as_ptr()
    }

    #[inline]
    fn handle(ptr: *mut ffi::PyObject) -> Option<RawHandle> {
        RawHandle::from_ptr(ptr)
    }

    /// C string for a name, or a pending `ValueError` for interior NULs
    fn c_name(name: &str) -> Option<CString> {
        match CString::new(name) {
            Ok(name) => Some(name),
            Err(_) => {
                // SAFETY: raising only needs an initialized interpreter.
                unsafe {
                    ffi::PyErr_SetString(
                        ffi::PyExc_ValueError,
                        b"embedded null character\0".as_ptr() as *const c_char,
                    );
                }
                None
            }
        }
    }

    unsafe fn to_string_lossy(obj: *mut ffi::PyObject) -> Option<String> {
        let mut size: ffi::Py_ssize_t = 0;
        let data = ffi::PyUnicode_AsUTF8AndSize(obj, &mut size);
        if data.is_null() {
            ffi::PyErr_Clear();
            return None;
        }
        let bytes = std::slice::from_raw_parts(data as *const u8, usize::try_from(size).ok()?);
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    unsafe fn describe(obj: *mut ffi::PyObject) -> Option<String> {
        if obj.is_null() {
            return None;
        }
        let text = ffi::PyObject_Str(obj);
        if text.is_null() {
            ffi::PyErr_Clear();
            return None;
        }
        let rendered = Self::to_string_lossy(text);
        ffi::Py_DecRef(text);
        rendered
    }

    unsafe fn type_name(ty: *mut ffi::PyObject) -> Option<String> {
        if ty.is_null() {
            return None;
        }
        let name = ffi::PyObject_GetAttrString(ty, b"__name__\0".as_ptr() as *const c_char);
        if name.is_null() {
            ffi::PyErr_Clear();
            return None;
        }
        let rendered = Self::to_string_lossy(name);
        ffi::Py_DecRef(name);
        rendered
    }
}

impl Host for PythonHost {
    fn name(&self) -> &str {
        "cpython"
    }

    fn initialize(&self) -> Result<(), String> {
        // SAFETY: plain lifecycle calls; initialization is idempotent.
        unsafe {
            if ffi::Py_IsInitialized() == 0 {
                ffi::Py_InitializeEx(0);
            }
            if ffi::Py_IsInitialized() == 0 {
                return Err("Py_InitializeEx left the interpreter uninitialized".to_string());
            }
        }
        Ok(())
    }

    fn finalize(&self) {
        // SAFETY: all handles are released before the session finalizes.
        unsafe {
            if ffi::Py_IsInitialized() != 0 && ffi::Py_FinalizeEx() < 0 {
                warn!(target: "plotbridge::session", "Py_FinalizeEx reported an error");
            }
        }
    }

    fn is_initialized(&self) -> bool {
        // SAFETY: callable at any time.
        unsafe { ffi::Py_IsInitialized() != 0 }
    }

    fn incref(&self, obj: RawHandle) {
        // SAFETY: `obj` is a live object (trait contract).
        unsafe { ffi::Py_IncRef(Self::ptr(obj)) }
    }

    fn decref(&self, obj: RawHandle) {
        // SAFETY: `obj` is a live object the caller owns a reference to.
        unsafe { ffi::Py_DecRef(Self::ptr(obj)) }
    }

    fn refcount(&self, obj: RawHandle) -> usize {
        // SAFETY: `obj` is a live object.
        let count = unsafe { ffi::Py_REFCNT(Self::ptr(obj)) };
        usize::try_from(count).unwrap_or(0)
    }

    fn none(&self) -> RawHandle {
        // SAFETY: `Py_None` is a static object, never null.
        unsafe { RawHandle::from_ptr_unchecked(ffi::Py_None()) }
    }

    fn boolean(&self, value: bool) -> RawHandle {
        // SAFETY: `Py_True`/`Py_False` are static objects, never null.
        unsafe {
            if value {
                RawHandle::from_ptr_unchecked(ffi::Py_True())
            } else {
                RawHandle::from_ptr_unchecked(ffi::Py_False())
            }
        }
    }

    fn new_float(&self, value: f64) -> Option<RawHandle> {
        // SAFETY: constructor, returns a new reference or NULL.
        Self::handle(unsafe { ffi::PyFloat_FromDouble(value) })
    }

    fn new_int(&self, value: i64) -> Option<RawHandle> {
        // SAFETY: as above.
        Self::handle(unsafe { ffi::PyLong_FromLongLong(value) })
    }

    fn new_str(&self, value: &str) -> Option<RawHandle> {
        let len = ffi::Py_ssize_t::try_from(value.len()).ok()?;
        // SAFETY: `value` is valid UTF-8 of exactly `len` bytes.
        Self::handle(unsafe { ffi::PyUnicode_FromStringAndSize(value.as_ptr() as *const c_char, len) })
    }

    fn new_list(&self, len: usize) -> Option<RawHandle> {
        let len = ffi::Py_ssize_t::try_from(len).ok()?;
        // SAFETY: slots start empty and are filled before the list escapes.
        Self::handle(unsafe { ffi::PyList_New(len) })
    }

    fn new_tuple(&self, len: usize) -> Option<RawHandle> {
        let len = ffi::Py_ssize_t::try_from(len).ok()?;
        // SAFETY: as above.
        Self::handle(unsafe { ffi::PyTuple_New(len) })
    }

    fn new_dict(&self) -> Option<RawHandle> {
        // SAFETY: constructor.
        Self::handle(unsafe { ffi::PyDict_New() })
    }

    fn list_set_item(&self, list: RawHandle, index: usize, item: RawHandle) -> bool {
        let Ok(index) = ffi::Py_ssize_t::try_from(index) else {
            self.decref(item);
            return false;
        };
        // SAFETY: steals `item` whatever the outcome.
        unsafe { ffi::PyList_SetItem(Self::ptr(list), index, Self::ptr(item)) == 0 }
    }

    fn tuple_set_item(&self, tuple: RawHandle, index: usize, item: RawHandle) -> bool {
        let Ok(index) = ffi::Py_ssize_t::try_from(index) else {
            self.decref(item);
            return false;
        };
        // SAFETY: steals `item` whatever the outcome.
        unsafe { ffi::PyTuple_SetItem(Self::ptr(tuple), index, Self::ptr(item)) == 0 }
    }

    fn dict_set_item(&self, dict: RawHandle, key: &str, value: RawHandle) -> bool {
        let Some(key) = Self::c_name(key) else {
            return false;
        };
        // SAFETY: does not steal `value`.
        unsafe { ffi::PyDict_SetItemString(Self::ptr(dict), key.as_ptr(), Self::ptr(value)) == 0 }
    }

    fn import(&self, module: &str) -> Option<RawHandle> {
        let module = Self::c_name(module)?;
        // SAFETY: returns a new reference or NULL with an exception set.
        Self::handle(unsafe { ffi::PyImport_ImportModule(module.as_ptr()) })
    }

    fn get_attr(&self, owner: RawHandle, name: &str) -> Option<RawHandle> {
        let name = Self::c_name(name)?;
        // SAFETY: as above.
        Self::handle(unsafe { ffi::PyObject_GetAttrString(Self::ptr(owner), name.as_ptr()) })
    }

    fn call(&self, callable: RawHandle, args: RawHandle, kwargs: Option<RawHandle>) -> Option<RawHandle> {
        let kwargs = kwargs.map_or(ptr::null_mut(), Self::ptr);
        // SAFETY: `args` is a tuple and `kwargs` a dict or NULL; runs arbitrary
        // Python code and returns a new reference or NULL.
        Self::handle(unsafe { ffi::PyObject_Call(Self::ptr(callable), Self::ptr(args), kwargs) })
    }

    fn get_item(&self, container: RawHandle, index: isize) -> Option<RawHandle> {
        // SAFETY: sequence protocol, new reference or NULL.
        Self::handle(unsafe { ffi::PySequence_GetItem(Self::ptr(container), index as ffi::Py_ssize_t) })
    }

    fn size(&self, obj: RawHandle) -> Option<usize> {
        // SAFETY: -1 with an exception set on failure.
        let size = unsafe { ffi::PyObject_Size(Self::ptr(obj)) };
        usize::try_from(size).ok()
    }

    fn kind(&self, obj: RawHandle) -> ObjectKind {
        let ptr = Self::ptr(obj);
        // SAFETY: type checks only read the object's type.
        unsafe {
            if ptr == ffi::Py_None() {
                ObjectKind::None
            } else if ffi::PyBool_Check(ptr) != 0 {
                ObjectKind::Bool
            } else if ffi::PyLong_Check(ptr) != 0 {
                ObjectKind::Int
            } else if ffi::PyFloat_Check(ptr) != 0 {
                ObjectKind::Float
            } else if ffi::PyUnicode_Check(ptr) != 0 {
                ObjectKind::Str
            } else if ffi::PyList_Check(ptr) != 0 {
                ObjectKind::List
            } else if ffi::PyTuple_Check(ptr) != 0 {
                ObjectKind::Tuple
            } else if ffi::PyDict_Check(ptr) != 0 {
                ObjectKind::Dict
            } else if ffi::PyModule_Check(ptr) != 0 {
                ObjectKind::Module
            } else if ffi::PyCallable_Check(ptr) != 0 {
                ObjectKind::Callable
            } else {
                ObjectKind::Other
            }
        }
    }

    fn as_f64(&self, obj: RawHandle) -> Option<f64> {
        // SAFETY: -1.0 plus a pending error signals failure.
        unsafe {
            let value = ffi::PyFloat_AsDouble(Self::ptr(obj));
            if value == -1.0 && !ffi::PyErr_Occurred().is_null() {
                ffi::PyErr_Clear();
                return None;
            }
            Some(value)
        }
    }

    fn as_i64(&self, obj: RawHandle) -> Option<i64> {
        // SAFETY: -1 plus a pending error signals failure.
        unsafe {
            let value = ffi::PyLong_AsLongLong(Self::ptr(obj));
            if value == -1 && !ffi::PyErr_Occurred().is_null() {
                ffi::PyErr_Clear();
                return None;
            }
            Some(value)
        }
    }

    fn as_string(&self, obj: RawHandle) -> Option<String> {
        // SAFETY: `obj` is live; non-str objects fail cleanly.
        unsafe { Self::to_string_lossy(Self::ptr(obj)) }
    }

    fn is_true(&self, obj: RawHandle) -> Option<bool> {
        // SAFETY: -1 signals an exception raised by `__bool__`.
        match unsafe { ffi::PyObject_IsTrue(Self::ptr(obj)) } {
            -1 => None,
            value => Some(value != 0),
        }
    }

    fn take_error(&self) -> Option<String> {
        let mut kind = ptr::null_mut();
        let mut value = ptr::null_mut();
        let mut traceback = ptr::null_mut();
        // SAFETY: PyErr_Fetch hands over (possibly NULL) new references.
        unsafe {
            if ffi::PyErr_Occurred().is_null() {
                return None;
            }
            ffi::PyErr_Fetch(&mut kind, &mut value, &mut traceback);
            let name = Self::type_name(kind).unwrap_or_else(|| "Exception".to_string());
            let message = Self::describe(value);
            for obj in [kind, value, traceback] {
                if !obj.is_null() {
                    ffi::Py_DecRef(obj);
                }
            }
            Some(match message {
                Some(message) if !message.is_empty() => format!("{}: {}", name, message),
                _ => name,
            })
        }
    }
}
