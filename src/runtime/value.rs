//! Dynamic values bound in instrumented namespaces
//!
//! Scalars are plain data. Lists, maps, callables and classes are shared
//! objects: cloning a [`Value`] clones the handle, and every object carries an
//! [`ObjectId`] assigned at construction. Identity questions ("is this the
//! same callable?") are answered by comparing ids, never by structure.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::class::ClassRef;
use super::dispatch::DispatchRef;
use super::error::{CallError, CallResult};
use super::function::FunctionRef;

/// Stable identity of a shared object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Allocate a fresh identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag used for dispatch routing and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// The absent value
    None,
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Floating point
    Float,
    /// UTF-8 string
    Str,
    /// Shared list
    List,
    /// Shared string-keyed map
    Map,
    /// Plain callable
    Function,
    /// Type-dispatching callable
    Dispatch,
    /// Class with a method table
    Class,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::None => "none",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::List => "list",
            TypeTag::Map => "map",
            TypeTag::Function => "function",
            TypeTag::Dispatch => "dispatch",
            TypeTag::Class => "class",
        };
        f.write_str(name)
    }
}

/// Shared, interior-mutable sequence
pub struct List {
    id: ObjectId,
    items: Mutex<Vec<Value>>,
}

/// Handle to a shared list
pub type ListRef = Arc<List>;

impl List {
    /// Create a list holding `items`
    pub fn new(items: Vec<Value>) -> ListRef {
        Arc::new(Self {
            id: ObjectId::new(),
            items: Mutex::new(items),
        })
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the list has no elements
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Append in place
    pub fn push(&self, value: Value) {
        self.items.lock().push(value);
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.lock().get(index).cloned()
    }

    /// Copy of the current elements (the elements themselves are shared)
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.lock().clone()
    }
}

/// Shared, interior-mutable string-keyed map
pub struct Map {
    id: ObjectId,
    entries: Mutex<BTreeMap<String, Value>>,
}

/// Handle to a shared map
pub type MapRef = Arc<Map>;

impl Map {
    /// Create a map holding `entries`
    pub fn new(entries: BTreeMap<String, Value>) -> MapRef {
        Arc::new(Self {
            id: ObjectId::new(),
            entries: Mutex::new(entries),
        })
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entry for `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert or replace in place
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.lock().insert(key.into(), value);
    }

    /// Copy of the current entries
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.entries.lock().clone()
    }
}

/// Dynamic value
#[derive(Clone)]
pub enum Value {
    /// The absent value
    None,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Shared list
    List(ListRef),
    /// Shared string-keyed map
    Map(MapRef),
    /// Plain callable
    Function(FunctionRef),
    /// Type-dispatching callable
    Dispatch(DispatchRef),
    /// Class with a method table
    Class(ClassRef),
}

impl Value {
    /// Build a list value
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(List::new(items))
    }

    /// Build a map value
    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Map::new(entries))
    }

    /// Tag describing this value's type
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::None => TypeTag::None,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::Str,
            Value::List(_) => TypeTag::List,
            Value::Map(_) => TypeTag::Map,
            Value::Function(_) => TypeTag::Function,
            Value::Dispatch(_) => TypeTag::Dispatch,
            Value::Class(_) => TypeTag::Class,
        }
    }

    /// Object identity for shared values; `None` for scalars
    pub fn identity(&self) -> Option<ObjectId> {
        match self {
            Value::List(list) => Some(list.id()),
            Value::Map(map) => Some(map.id()),
            Value::Function(function) => Some(function.id()),
            Value::Dispatch(table) => Some(table.id()),
            Value::Class(class) => Some(class.id()),
            _ => None,
        }
    }

    /// Same object for shared values, equal data for scalars.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self == other,
            _ => false,
        }
    }

    /// Copy the outer container only.
    ///
    /// Lists and maps get a new identity holding the same elements; callables
    /// and classes are returned as-is.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::List(list) => Value::list(list.to_vec()),
            Value::Map(map) => Value::map(map.to_map()),
            other => other.clone(),
        }
    }

    /// Whether `call` can succeed on this value
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Dispatch(_))
    }

    /// Invoke a callable value
    pub fn call(&self, args: &super::Args) -> CallResult<Value> {
        match self {
            Value::Function(function) => function.call(args),
            Value::Dispatch(table) => table.call(args),
            other => Err(CallError::NotCallable(other.type_tag().to_string())),
        }
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(num) => Some(*num),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    /// List handle
    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Map handle
    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Function handle
    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Dispatch table handle
    pub fn as_dispatch(&self) -> Option<&DispatchRef> {
        match self {
            Value::Dispatch(table) => Some(table),
            _ => None,
        }
    }

    /// Class handle
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Snapshot each side before comparing so no two locks are held at once.
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b) || a.to_vec() == b.to_vec(),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || a.to_map() == b.to_map(),
            (Value::Function(a), Value::Function(b)) => a.id() == b.id(),
            (Value::Dispatch(a), Value::Dispatch(b)) => a.id() == b.id(),
            (Value::Class(a), Value::Class(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Int(num) => write!(f, "{num}"),
            Value::Float(num) => write!(f, "{num:?}"),
            Value::Str(text) => write!(f, "{text:?}"),
            Value::List(list) => f.debug_list().entries(list.to_vec()).finish(),
            Value::Map(map) => f.debug_map().entries(map.to_map()).finish(),
            Value::Function(function) => write!(f, "<function {}>", function.name()),
            Value::Dispatch(table) => write!(f, "<dispatch {}>", table.name()),
            Value::Class(class) => write!(f, "<class {}>", class.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(num: i64) -> Self {
        Value::Int(num)
    }
}

impl From<i32> for Value {
    fn from(num: i32) -> Self {
        Value::Int(i64::from(num))
    }
}

impl From<f64> for Value {
    fn from(num: f64) -> Self {
        Value::Float(num)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Str(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Str(text)
    }
}

impl From<FunctionRef> for Value {
    fn from(function: FunctionRef) -> Self {
        Value::Function(function)
    }
}

impl From<DispatchRef> for Value {
    fn from(table: DispatchRef) -> Self {
        Value::Dispatch(table)
    }
}

impl From<ClassRef> for Value {
    fn from(class: ClassRef) -> Self {
        Value::Class(class)
    }
}
