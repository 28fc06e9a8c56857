//! Recording host - an in-process reference-counted object heap
//!
//! Models the parts of the embedded runtime the boundary layer touches:
//! reference counts with cascading release, immortal singletons, stealing
//! container slots, pending errors, and a headless stand-in for the plotting
//! modules that records every call instead of drawing.
//!
//! Slots are never reused, so a stale handle keeps pointing at a dead slot
//! and any increment or decrement through it is reported in
//! [`RecordingHost::violations`] rather than corrupting another object.

use super::{Host, ObjectKind, RawHandle};
use crate::logging::debug;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::num::NonZeroUsize;

const PYPLOT_FUNCTIONS: &[&str] = &[
    "annotate",
    "arrow",
    "axhline",
    "axvline",
    "axvspan",
    "bar",
    "boxplot",
    "clf",
    "close",
    "contour",
    "errorbar",
    "figure",
    "fignum_exists",
    "fill_between",
    "gca",
    "gcf",
    "ginput",
    "grid",
    "hist",
    "legend",
    "pause",
    "plot",
    "savefig",
    "scatter",
    "show",
    "subplot",
    "subplots",
    "subplots_adjust",
    "suptitle",
    "text",
    "tight_layout",
    "title",
    "twinx",
    "twiny",
    "xlabel",
    "xlim",
    "xticks",
    "ylabel",
    "ylim",
    "yticks",
];

const COLORMAPS: &[&str] = &["coolwarm", "viridis", "gray"];

/// Methods reachable through attribute lookup on instances of each class
fn class_methods(class: &str) -> &'static [&'static str] {
    match class {
        "Axes" => &[
            "axhline",
            "axvline",
            "cla",
            "grid",
            "legend",
            "plot",
            "set_title",
            "set_xlabel",
            "set_xlim",
            "set_xticks",
            "set_ylabel",
            "set_ylim",
            "set_yticks",
            "twinx",
            "twiny",
        ],
        "Figure" => &["savefig"],
        "RcParams" => &["update"],
        _ => &[],
    }
}

/// One recorded invocation, arguments rendered as JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    /// `name` for module functions, `Class.name` for methods
    pub callable: String,
    pub args: Vec<JsonValue>,
    pub kwargs: BTreeMap<String, JsonValue>,
}

impl CallRecord {
    pub fn kwarg(&self, key: &str) -> Option<&JsonValue> {
        self.kwargs.get(key)
    }
}

#[derive(Debug, Clone)]
enum Object {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Option<RawHandle>>),
    Tuple(Vec<Option<RawHandle>>),
    Dict(BTreeMap<String, RawHandle>),
    Module {
        name: String,
        attrs: BTreeMap<String, RawHandle>,
    },
    Function {
        name: String,
    },
    Method {
        class: &'static str,
        name: String,
        receiver: RawHandle,
    },
    Instance {
        class: &'static str,
        attrs: BTreeMap<String, RawHandle>,
    },
}

impl Object {
    fn kind(&self) -> ObjectKind {
        match self {
            Self::None => ObjectKind::None,
            Self::Bool(_) => ObjectKind::Bool,
            Self::Int(_) => ObjectKind::Int,
            Self::Float(_) => ObjectKind::Float,
            Self::Str(_) => ObjectKind::Str,
            Self::List(_) => ObjectKind::List,
            Self::Tuple(_) => ObjectKind::Tuple,
            Self::Dict(_) => ObjectKind::Dict,
            Self::Module { .. } => ObjectKind::Module,
            Self::Function { .. } | Self::Method { .. } => ObjectKind::Callable,
            Self::Instance { .. } => ObjectKind::Other,
        }
    }

    fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Module { .. } => "module",
            Self::Function { .. } => "function",
            Self::Method { .. } => "method",
            Self::Instance { class, .. } => class,
        }
    }

    /// Handles this object holds a reference to
    fn children(self) -> Vec<RawHandle> {
        match self {
            Self::List(items) | Self::Tuple(items) => items.into_iter().flatten().collect(),
            Self::Dict(entries) => entries.into_values().collect(),
            Self::Module { attrs, .. } | Self::Instance { attrs, .. } => attrs.into_values().collect(),
            Self::Method { receiver, .. } => vec![receiver],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    refcount: usize,
    immortal: bool,
    /// `None` once freed
    object: Option<Object>,
}

#[derive(Debug)]
struct Heap {
    slots: Vec<Slot>,
    none: RawHandle,
    true_: RawHandle,
    false_: RawHandle,
    initialized: bool,
    /// Module cache; holds one reference per module
    modules: BTreeMap<String, RawHandle>,
    error: Option<String>,
    violations: Vec<String>,
    calls: Vec<CallRecord>,
    failures: HashMap<String, String>,
    hidden_modules: BTreeSet<String>,
    init_failure: Option<String>,
    allocation_budget: Option<usize>,
    figures: Vec<i64>,
    last_figure: i64,
}

#[inline]
fn handle(index: usize) -> RawHandle {
    RawHandle::from_addr(NonZeroUsize::MIN.saturating_add(index))
}

impl Heap {
    fn new() -> Self {
        let mut heap = Self {
            slots: Vec::new(),
            none: handle(0),
            true_: handle(1),
            false_: handle(2),
            initialized: false,
            modules: BTreeMap::new(),
            error: None,
            violations: Vec::new(),
            calls: Vec::new(),
            failures: HashMap::new(),
            hidden_modules: BTreeSet::new(),
            init_failure: None,
            allocation_budget: None,
            figures: Vec::new(),
            last_figure: 0,
        };
        heap.none = heap.immortal(Object::None);
        heap.true_ = heap.immortal(Object::Bool(true));
        heap.false_ = heap.immortal(Object::Bool(false));
        heap
    }

    fn immortal(&mut self, object: Object) -> RawHandle {
        self.slots.push(Slot {
            refcount: 1,
            immortal: true,
            object: Some(object),
        });
        handle(self.slots.len() - 1)
    }

    /// Allocate with refcount 1, bypassing the allocation budget
    fn alloc(&mut self, object: Object) -> RawHandle {
        self.slots.push(Slot {
            refcount: 1,
            immortal: false,
            object: Some(object),
        });
        handle(self.slots.len() - 1)
    }

    /// Allocation through a public entry point
    fn alloc_checked(&mut self, object: Object) -> Option<RawHandle> {
        if !self.require_initialized() {
            return None;
        }
        match self.allocation_budget {
            Some(0) => {
                self.raise("MemoryError: allocation budget exhausted");
                return None;
            }
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        Some(self.alloc(object))
    }

    fn slot(&self, raw: RawHandle) -> Option<&Slot> {
        self.slots.get(raw.addr() - 1)
    }

    fn object(&self, raw: RawHandle) -> Option<&Object> {
        self.slot(raw).and_then(|slot| slot.object.as_ref())
    }

    fn object_mut(&mut self, raw: RawHandle) -> Option<&mut Object> {
        self.slots
            .get_mut(raw.addr() - 1)
            .and_then(|slot| slot.object.as_mut())
    }

    fn raise(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    fn require_initialized(&mut self) -> bool {
        if !self.initialized {
            self.raise("RuntimeError: runtime is not initialized");
        }
        self.initialized
    }

    fn incref(&mut self, raw: RawHandle) {
        match self.slots.get_mut(raw.addr() - 1) {
            Some(slot) if slot.object.is_some() => slot.refcount += 1,
            _ => self.violations.push(format!("incref of dead object {:?}", raw)),
        }
    }

    /// New reference to an existing object
    fn share(&mut self, raw: RawHandle) -> RawHandle {
        self.incref(raw);
        raw
    }

    fn decref(&mut self, raw: RawHandle) {
        let mut pending = vec![raw];
        while let Some(raw) = pending.pop() {
            let Some(slot) = self.slots.get_mut(raw.addr() - 1) else {
                self.violations.push(format!("decref of unknown handle {:?}", raw));
                continue;
            };
            if slot.object.is_none() || slot.refcount == 0 {
                self.violations.push(format!("decref of dead object {:?}", raw));
                continue;
            }
            slot.refcount -= 1;
            if slot.refcount > 0 {
                continue;
            }
            if slot.immortal {
                self.violations
                    .push(format!("runtime-owned singleton {:?} released to zero", raw));
                continue;
            }
            if let Some(object) = slot.object.take() {
                pending.extend(object.children());
            }
        }
    }

    fn set_slot(&mut self, container: RawHandle, index: usize, item: RawHandle, tuple: bool) -> bool {
        let replaced = match self.object_mut(container) {
            Some(Object::List(items)) if !tuple => items.get_mut(index).map(|slot| slot.replace(item)),
            Some(Object::Tuple(items)) if tuple => items.get_mut(index).map(|slot| slot.replace(item)),
            _ => {
                let expected = if tuple { "tuple" } else { "list" };
                self.raise(format!("SystemError: bad argument, expected a {}", expected));
                // The item is stolen even on failure.
                self.decref(item);
                return false;
            }
        };
        match replaced {
            Some(old) => {
                if let Some(old) = old {
                    self.decref(old);
                }
                true
            }
            None => {
                self.raise("IndexError: assignment index out of range");
                self.decref(item);
                false
            }
        }
    }

    fn module(&mut self, name: &str) -> Option<RawHandle> {
        if let Some(&module) = self.modules.get(name) {
            return Some(self.share(module));
        }
        if self.hidden_modules.contains(name) {
            self.raise(format!("ModuleNotFoundError: No module named '{}'", name));
            return None;
        }
        let mut attrs = BTreeMap::new();
        let function = |heap: &mut Self, attr: &str| {
            heap.alloc(Object::Function {
                name: attr.to_string(),
            })
        };
        match name {
            "matplotlib" => {
                attrs.insert("use".to_string(), function(self, "use"));
                attrs.insert("rcParams".to_string(), self.instance("RcParams", BTreeMap::new()));
            }
            "matplotlib.pyplot" => {
                for &attr in PYPLOT_FUNCTIONS {
                    attrs.insert(attr.to_string(), function(self, attr));
                }
                attrs.insert("rcParams".to_string(), self.instance("RcParams", BTreeMap::new()));
            }
            "matplotlib.cm" => {
                for &attr in COLORMAPS {
                    attrs.insert(attr.to_string(), self.instance("Colormap", BTreeMap::new()));
                }
            }
            _ => {
                self.raise(format!("ModuleNotFoundError: No module named '{}'", name));
                return None;
            }
        }
        let module = self.alloc(Object::Module {
            name: name.to_string(),
            attrs,
        });
        self.modules.insert(name.to_string(), module);
        Some(self.share(module))
    }

    fn instance(&mut self, class: &'static str, attrs: BTreeMap<String, RawHandle>) -> RawHandle {
        self.alloc(Object::Instance { class, attrs })
    }

    fn get_attr(&mut self, owner: RawHandle, name: &str) -> Option<RawHandle> {
        let found = match self.object(owner) {
            Some(Object::Module { name: module, attrs }) => attrs
                .get(name)
                .copied()
                .ok_or_else(|| format!("AttributeError: module '{}' has no attribute '{}'", module, name)),
            Some(Object::Instance { class, attrs }) => match attrs.get(name) {
                Some(&attr) => Ok(attr),
                None if class_methods(class).iter().any(|method| *method == name) => {
                    let class = *class;
                    let receiver = self.share(owner);
                    return Some(self.alloc(Object::Method {
                        class,
                        name: name.to_string(),
                        receiver,
                    }));
                }
                None => Err(format!("AttributeError: '{}' object has no attribute '{}'", class, name)),
            },
            Some(object) => Err(format!(
                "AttributeError: '{}' object has no attribute '{}'",
                object.type_name(),
                name
            )),
            None => Err("SystemError: attribute lookup on a dead object".to_string()),
        };
        match found {
            Ok(attr) => Some(self.share(attr)),
            Err(message) => {
                self.raise(message);
                None
            }
        }
    }

    fn render(&self, raw: RawHandle) -> JsonValue {
        match self.object(raw) {
            Some(Object::None) | None => JsonValue::Null,
            Some(Object::Bool(value)) => JsonValue::Bool(*value),
            Some(Object::Int(value)) => JsonValue::from(*value),
            Some(Object::Float(value)) => {
                serde_json::Number::from_f64(*value).map_or(JsonValue::Null, JsonValue::Number)
            }
            Some(Object::Str(value)) => JsonValue::String(value.clone()),
            Some(Object::List(items)) | Some(Object::Tuple(items)) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| item.map_or(JsonValue::Null, |item| self.render(item)))
                    .collect(),
            ),
            Some(Object::Dict(entries)) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), self.render(*value)))
                    .collect(),
            ),
            Some(Object::Module { name, .. }) => JsonValue::String(format!("<module {}>", name)),
            Some(Object::Function { name }) => JsonValue::String(format!("<function {}>", name)),
            Some(Object::Method { class, name, .. }) => {
                JsonValue::String(format!("<method {}.{}>", class, name))
            }
            Some(Object::Instance { class, .. }) => JsonValue::String(format!("<{}>", class)),
        }
    }

    fn int_arg(&self, args: &[RawHandle], index: usize, kwargs: &BTreeMap<String, RawHandle>, key: &str) -> Option<i64> {
        let raw = args.get(index).or_else(|| kwargs.get(key))?;
        match self.object(*raw) {
            Some(Object::Int(value)) => Some(*value),
            _ => None,
        }
    }

    fn call(&mut self, callable: RawHandle, args: RawHandle, kwargs: Option<RawHandle>) -> Option<RawHandle> {
        let name = match self.object(callable) {
            Some(Object::Function { name }) => name.clone(),
            Some(Object::Method { class, name, .. }) => format!("{}.{}", class, name),
            Some(object) => {
                let message = format!("TypeError: '{}' object is not callable", object.type_name());
                self.raise(message);
                return None;
            }
            None => {
                self.raise("SystemError: call on a dead object");
                return None;
            }
        };
        let args: Vec<RawHandle> = match self.object(args) {
            Some(Object::Tuple(items)) if items.iter().all(Option::is_some) => items.iter().flatten().copied().collect(),
            _ => {
                self.raise("SystemError: positional arguments must be a complete tuple");
                return None;
            }
        };
        let kwargs = match kwargs.map(|kwargs| self.object(kwargs)) {
            None => BTreeMap::new(),
            Some(Some(Object::Dict(entries))) => entries.clone(),
            Some(_) => {
                self.raise("TypeError: keyword arguments must be a dict");
                return None;
            }
        };

        let record = CallRecord {
            callable: name.clone(),
            args: args.iter().map(|&arg| self.render(arg)).collect(),
            kwargs: kwargs
                .iter()
                .map(|(key, &value)| (key.clone(), self.render(value)))
                .collect(),
        };
        debug!(target: "plotbridge::recording", callable = %record.callable, args = record.args.len(), "call");
        self.calls.push(record);

        if let Some(message) = self.failures.get(&name) {
            let message = message.clone();
            self.raise(message);
            return None;
        }

        let result = match name.as_str() {
            "subplots" => self.subplots(&args, &kwargs)?,
            "figure" => {
                let number = self.int_arg(&args, 0, &kwargs, "num");
                self.figure(number)
            }
            "gcf" => {
                let number = self.figures.last().copied();
                self.figure(number)
            }
            "gca" | "subplot" | "twinx" | "twiny" | "Axes.twinx" | "Axes.twiny" => {
                self.instance("Axes", BTreeMap::new())
            }
            "xlim" | "ylim" => self.limits(&args),
            "fignum_exists" => {
                let number = self.int_arg(&args, 0, &kwargs, "num");
                let exists = number.is_some_and(|number| self.figures.contains(&number));
                let singleton = if exists { self.true_ } else { self.false_ };
                self.share(singleton)
            }
            "close" => {
                self.close_figure(&args);
                self.share(self.none)
            }
            "ginput" => self.alloc(Object::List(Vec::new())),
            _ => self.share(self.none),
        };
        Some(result)
    }

    fn figure(&mut self, number: Option<i64>) -> RawHandle {
        let number = number.unwrap_or(self.last_figure + 1);
        if !self.figures.contains(&number) {
            self.figures.push(number);
        }
        self.last_figure = self.last_figure.max(number);
        let number = self.alloc(Object::Int(number));
        self.instance("Figure", BTreeMap::from([("number".to_string(), number)]))
    }

    fn close_figure(&mut self, args: &[RawHandle]) {
        match args.first().and_then(|&arg| self.object(arg)) {
            Some(Object::Str(which)) if which == "all" => self.figures.clear(),
            Some(Object::Int(number)) => {
                let number = *number;
                self.figures.retain(|&figure| figure != number);
            }
            _ => {
                self.figures.pop();
            }
        }
    }

    /// `(figure, axes)`; axes is a single object, a list, or a list of rows
    fn subplots(&mut self, args: &[RawHandle], kwargs: &BTreeMap<String, RawHandle>) -> Option<RawHandle> {
        let nrows = self.int_arg(args, 0, kwargs, "nrows").unwrap_or(1).max(1) as usize;
        let ncols = self.int_arg(args, 1, kwargs, "ncols").unwrap_or(1).max(1) as usize;
        let Some(count) = nrows.checked_mul(ncols) else {
            self.raise(format!("ValueError: a {}x{} subplot layout is too large", nrows, ncols));
            return None;
        };
        let figure = self.figure(None);
        let axes_row = |heap: &mut Self, len: usize| {
            let items = (0..len)
                .map(|_| Some(heap.instance("Axes", BTreeMap::new())))
                .collect();
            heap.alloc(Object::List(items))
        };
        let axes = if count == 1 {
            self.instance("Axes", BTreeMap::new())
        } else if nrows == 1 || ncols == 1 {
            axes_row(self, count)
        } else {
            let rows = (0..nrows).map(|_| Some(axes_row(self, ncols))).collect();
            self.alloc(Object::List(rows))
        };
        Some(self.alloc(Object::Tuple(vec![Some(figure), Some(axes)])))
    }

    /// Getter form returns the default limits; setter form echoes its input
    fn limits(&mut self, args: &[RawHandle]) -> RawHandle {
        let echoed: Vec<RawHandle> = match args {
            [] => {
                let low = self.alloc(Object::Float(0.0));
                let high = self.alloc(Object::Float(1.0));
                return self.alloc(Object::Tuple(vec![Some(low), Some(high)]));
            }
            [single] => match self.object(*single) {
                Some(Object::List(items)) | Some(Object::Tuple(items)) => items.iter().flatten().copied().collect(),
                _ => vec![*single],
            },
            many => many.to_vec(),
        };
        let items = echoed.into_iter().map(|item| Some(self.share(item))).collect();
        self.alloc(Object::Tuple(items))
    }
}

/// In-process [`Host`] with a recording plotting module.
///
/// Not `Sync`: like the embedded runtime it stands in for, it must only be
/// driven from one thread.
#[derive(Debug)]
pub struct RecordingHost {
    heap: RefCell<Heap>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            heap: RefCell::new(Heap::new()),
        }
    }

    /// Make every call to `callable` raise `message`
    pub fn with_failure(self, callable: &str, message: &str) -> Self {
        self.fail_call(callable, message);
        self
    }

    pub fn fail_call(&self, callable: &str, message: &str) {
        self.heap
            .borrow_mut()
            .failures
            .insert(callable.to_string(), message.to_string());
    }

    /// Make importing `module` fail
    pub fn without_module(self, module: &str) -> Self {
        self.heap.borrow_mut().hidden_modules.insert(module.to_string());
        self
    }

    /// Make [`Host::initialize`] fail
    pub fn with_init_failure(self, message: &str) -> Self {
        self.heap.borrow_mut().init_failure = Some(message.to_string());
        self
    }

    /// Let only the next `count` object creations succeed; `None` lifts the limit
    pub fn limit_allocations(&self, count: Option<usize>) {
        self.heap.borrow_mut().allocation_budget = count;
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.heap.borrow().calls.clone()
    }

    pub fn last_call(&self) -> Option<CallRecord> {
        self.heap.borrow().calls.last().cloned()
    }

    pub fn clear_calls(&self) {
        self.heap.borrow_mut().calls.clear();
    }

    /// Every recorded call as pretty-printed JSON
    pub fn transcript(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.heap.borrow().calls)
    }

    /// Reference counting misuse observed so far
    pub fn violations(&self) -> Vec<String> {
        self.heap.borrow().violations.clone()
    }

    /// Number of live objects, singletons excluded
    pub fn live_objects(&self) -> usize {
        self.heap
            .borrow()
            .slots
            .iter()
            .filter(|slot| !slot.immortal && slot.object.is_some())
            .count()
    }

    pub fn is_live(&self, obj: RawHandle) -> bool {
        self.heap.borrow().object(obj).is_some()
    }
}

impl Host for RecordingHost {
    fn name(&self) -> &str {
        "recording"
    }

    fn initialize(&self) -> Result<(), String> {
        let mut heap = self.heap.borrow_mut();
        if let Some(message) = &heap.init_failure {
            return Err(message.clone());
        }
        heap.initialized = true;
        Ok(())
    }

    fn finalize(&self) {
        let mut heap = self.heap.borrow_mut();
        let modules = std::mem::take(&mut heap.modules);
        for module in modules.into_values() {
            heap.decref(module);
        }
        heap.figures.clear();
        heap.last_figure = 0;
        heap.error = None;
        heap.initialized = false;
    }

    fn is_initialized(&self) -> bool {
        self.heap.borrow().initialized
    }

    fn incref(&self, obj: RawHandle) {
        self.heap.borrow_mut().incref(obj);
    }

    fn decref(&self, obj: RawHandle) {
        self.heap.borrow_mut().decref(obj);
    }

    fn refcount(&self, obj: RawHandle) -> usize {
        let heap = self.heap.borrow();
        match heap.slot(obj) {
            Some(slot) if slot.object.is_some() => slot.refcount,
            _ => 0,
        }
    }

    fn none(&self) -> RawHandle {
        self.heap.borrow().none
    }

    fn boolean(&self, value: bool) -> RawHandle {
        let heap = self.heap.borrow();
        if value {
            heap.true_
        } else {
            heap.false_
        }
    }

    fn new_float(&self, value: f64) -> Option<RawHandle> {
        self.heap.borrow_mut().alloc_checked(Object::Float(value))
    }

    fn new_int(&self, value: i64) -> Option<RawHandle> {
        self.heap.borrow_mut().alloc_checked(Object::Int(value))
    }

    fn new_str(&self, value: &str) -> Option<RawHandle> {
        self.heap.borrow_mut().alloc_checked(Object::Str(value.to_string()))
    }

    fn new_list(&self, len: usize) -> Option<RawHandle> {
        self.heap.borrow_mut().alloc_checked(Object::List(vec![None; len]))
    }

    fn new_tuple(&self, len: usize) -> Option<RawHandle> {
        self.heap.borrow_mut().alloc_checked(Object::Tuple(vec![None; len]))
    }

    fn new_dict(&self) -> Option<RawHandle> {
        self.heap.borrow_mut().alloc_checked(Object::Dict(BTreeMap::new()))
    }

    fn list_set_item(&self, list: RawHandle, index: usize, item: RawHandle) -> bool {
        self.heap.borrow_mut().set_slot(list, index, item, false)
    }

    fn tuple_set_item(&self, tuple: RawHandle, index: usize, item: RawHandle) -> bool {
        self.heap.borrow_mut().set_slot(tuple, index, item, true)
    }

    fn dict_set_item(&self, dict: RawHandle, key: &str, value: RawHandle) -> bool {
        let mut heap = self.heap.borrow_mut();
        if heap.object(value).is_none() {
            heap.raise("SystemError: dict value is a dead object");
            return false;
        }
        if !matches!(heap.object(dict), Some(Object::Dict(_))) {
            heap.raise("SystemError: bad argument, expected a dict");
            return false;
        }
        heap.incref(value);
        let old = match heap.object_mut(dict) {
            Some(Object::Dict(entries)) => entries.insert(key.to_string(), value),
            _ => None,
        };
        if let Some(old) = old {
            heap.decref(old);
        }
        true
    }

    fn import(&self, module: &str) -> Option<RawHandle> {
        let mut heap = self.heap.borrow_mut();
        if !heap.require_initialized() {
            return None;
        }
        heap.module(module)
    }

    fn get_attr(&self, owner: RawHandle, name: &str) -> Option<RawHandle> {
        let mut heap = self.heap.borrow_mut();
        if !heap.require_initialized() {
            return None;
        }
        heap.get_attr(owner, name)
    }

    fn call(&self, callable: RawHandle, args: RawHandle, kwargs: Option<RawHandle>) -> Option<RawHandle> {
        let mut heap = self.heap.borrow_mut();
        if !heap.require_initialized() {
            return None;
        }
        heap.call(callable, args, kwargs)
    }

    fn get_item(&self, container: RawHandle, index: isize) -> Option<RawHandle> {
        let mut heap = self.heap.borrow_mut();
        let item = match heap.object(container) {
            Some(Object::List(items)) | Some(Object::Tuple(items)) => {
                let len = items.len() as isize;
                let position = if index < 0 { index + len } else { index };
                match usize::try_from(position).ok().and_then(|position| items.get(position)) {
                    Some(Some(item)) => Ok(*item),
                    Some(None) => Err("SystemError: unset container slot".to_string()),
                    None => Err("IndexError: index out of range".to_string()),
                }
            }
            Some(object) => Err(format!("TypeError: '{}' object is not subscriptable", object.type_name())),
            None => Err("SystemError: subscript of a dead object".to_string()),
        };
        match item {
            Ok(item) => Some(heap.share(item)),
            Err(message) => {
                heap.raise(message);
                None
            }
        }
    }

    fn size(&self, obj: RawHandle) -> Option<usize> {
        let mut heap = self.heap.borrow_mut();
        let size = match heap.object(obj) {
            Some(Object::Str(value)) => Ok(value.chars().count()),
            Some(Object::List(items)) | Some(Object::Tuple(items)) => Ok(items.len()),
            Some(Object::Dict(entries)) => Ok(entries.len()),
            Some(object) => Err(format!("TypeError: object of type '{}' has no len()", object.type_name())),
            None => Err("SystemError: len of a dead object".to_string()),
        };
        size.map_err(|message| heap.raise(message)).ok()
    }

    fn kind(&self, obj: RawHandle) -> ObjectKind {
        self.heap
            .borrow()
            .object(obj)
            .map_or(ObjectKind::Other, Object::kind)
    }

    fn as_f64(&self, obj: RawHandle) -> Option<f64> {
        match self.heap.borrow().object(obj)? {
            Object::Float(value) => Some(*value),
            Object::Int(value) => Some(*value as f64),
            Object::Bool(value) => Some(f64::from(u8::from(*value))),
            _ => None,
        }
    }

    fn as_i64(&self, obj: RawHandle) -> Option<i64> {
        match self.heap.borrow().object(obj)? {
            Object::Int(value) => Some(*value),
            Object::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    fn as_string(&self, obj: RawHandle) -> Option<String> {
        match self.heap.borrow().object(obj)? {
            Object::Str(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn is_true(&self, obj: RawHandle) -> Option<bool> {
        Some(match self.heap.borrow().object(obj)? {
            Object::None => false,
            Object::Bool(value) => *value,
            Object::Int(value) => *value != 0,
            Object::Float(value) => *value != 0.0,
            Object::Str(value) => !value.is_empty(),
            Object::List(items) | Object::Tuple(items) => !items.is_empty(),
            Object::Dict(entries) => !entries.is_empty(),
            _ => true,
        })
    }

    fn take_error(&self) -> Option<String> {
        self.heap.borrow_mut().error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> RecordingHost {
        let host = RecordingHost::new();
        host.initialize().unwrap();
        host
    }

    #[test]
    fn test_release_cascades_to_items() {
        let host = host();
        let list = host.new_list(2).unwrap();
        let first = host.new_int(1).unwrap();
        let second = host.new_str("two").unwrap();
        assert!(host.list_set_item(list, 0, first));
        assert!(host.list_set_item(list, 1, second));
        assert_eq!(host.live_objects(), 3);

        host.decref(list);
        assert_eq!(host.live_objects(), 0);
        assert!(!host.is_live(first));
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_decref_of_freed_object_is_a_violation() {
        let host = host();
        let value = host.new_float(1.5).unwrap();
        host.decref(value);
        host.decref(value);
        assert_eq!(host.violations().len(), 1);
        assert_eq!(host.refcount(value), 0);
    }

    #[test]
    fn test_singleton_underflow_is_a_violation() {
        let host = host();
        let yes = host.boolean(true);
        assert_eq!(host.refcount(yes), 1);
        host.decref(yes);
        assert_eq!(host.violations().len(), 1);
    }

    #[test]
    fn test_dict_set_item_does_not_steal() {
        let host = host();
        let dict = host.new_dict().unwrap();
        let value = host.new_float(0.5).unwrap();
        assert!(host.dict_set_item(dict, "alpha", value));
        assert_eq!(host.refcount(value), 2);
        host.decref(value);
        host.decref(dict);
        assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn test_unknown_module() {
        let host = host();
        assert!(host.import("seaborn").is_none());
        assert_eq!(
            host.take_error().as_deref(),
            Some("ModuleNotFoundError: No module named 'seaborn'")
        );
    }

    #[test]
    fn test_not_initialized() {
        let host = RecordingHost::new();
        assert!(host.new_int(1).is_none());
        assert!(host.take_error().unwrap().starts_with("RuntimeError"));
    }

    #[test]
    fn test_call_records_arguments() {
        let host = host();
        let pyplot = host.import("matplotlib.pyplot").unwrap();
        let plot = host.get_attr(pyplot, "plot").unwrap();
        let args = host.new_tuple(1).unwrap();
        let label = host.new_str("cos").unwrap();
        assert!(host.tuple_set_item(args, 0, label));

        let result = host.call(plot, args, None).unwrap();
        assert_eq!(host.kind(result), ObjectKind::None);
        let record = host.last_call().unwrap();
        assert_eq!(record.callable, "plot");
        assert_eq!(record.args, vec![JsonValue::from("cos")]);

        for obj in [result, args, plot, pyplot] {
            host.decref(obj);
        }
        host.finalize();
        assert_eq!(host.live_objects(), 0);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_injected_failure() {
        let host = host().with_failure("savefig", "OSError: read-only file system");
        let pyplot = host.import("matplotlib.pyplot").unwrap();
        let savefig = host.get_attr(pyplot, "savefig").unwrap();
        let args = host.new_tuple(0).unwrap();
        assert!(host.call(savefig, args, None).is_none());
        assert_eq!(host.take_error().as_deref(), Some("OSError: read-only file system"));
    }

    #[test]
    fn test_method_holds_receiver() {
        let host = host();
        let pyplot = host.import("matplotlib.pyplot").unwrap();
        let gca = host.get_attr(pyplot, "gca").unwrap();
        let args = host.new_tuple(0).unwrap();
        let axes = host.call(gca, args, None).unwrap();
        let plot = host.get_attr(axes, "plot").unwrap();
        assert_eq!(host.refcount(axes), 2);
        host.decref(axes);
        assert!(host.is_live(axes));
        host.decref(plot);
        assert!(!host.is_live(axes));
        assert!(host.get_attr(gca, "nope").is_none());
    }

    #[test]
    fn test_oversized_subplot_layout_raises() {
        let host = host();
        let pyplot = host.import("matplotlib.pyplot").unwrap();
        let subplots = host.get_attr(pyplot, "subplots").unwrap();
        let args = host.new_tuple(2).unwrap();
        let nrows = host.new_int(i64::MAX).unwrap();
        let ncols = host.new_int(4).unwrap();
        assert!(host.tuple_set_item(args, 0, nrows));
        assert!(host.tuple_set_item(args, 1, ncols));

        assert!(host.call(subplots, args, None).is_none());
        assert!(host.take_error().unwrap().starts_with("ValueError"));
        for obj in [args, subplots, pyplot] {
            host.decref(obj);
        }
        host.finalize();
        assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn test_allocation_budget() {
        let host = host();
        host.limit_allocations(Some(1));
        assert!(host.new_int(1).is_some());
        assert!(host.new_int(2).is_none());
        assert!(host.take_error().unwrap().starts_with("MemoryError"));
        host.limit_allocations(None);
        assert!(host.new_int(3).is_some());
    }
}
