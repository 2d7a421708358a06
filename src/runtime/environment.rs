//! Caller-supplied namespaces
//!
//! The enforcement scope never reflects over program state. It only touches
//! the namespaces it was handed, through the [`Namespace`] trait.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::value::Value;

/// A mutable name → value mapping the scope can enumerate and rebind.
pub trait Namespace: Send + Sync {
    /// Snapshot of the current bindings, in insertion order
    fn entries(&self) -> Vec<(String, Value)>;

    /// Rebind `name` to `value`
    fn rebind(&self, name: &str, value: Value);
}

/// Shared, ordered name → value mapping.
///
/// Clones share storage, so a caller keeps a handle while the scope
/// instruments another.
#[derive(Clone, Default)]
pub struct Environment {
    bindings: Arc<RwLock<Vec<(String, Value)>>>,
}

impl Environment {
    /// Empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Environment::define`]
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.define(name, value);
        self
    }

    /// Bind `name`, replacing any existing binding in place
    pub fn define(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        let mut bindings = self.bindings.write();
        match bindings.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => bindings.push((name, value)),
        }
    }

    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings
            .read()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.clone())
    }

    /// Whether `name` is bound
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().iter().any(|(existing, _)| existing == name)
    }

    /// Bound names in insertion order
    pub fn names(&self) -> Vec<String> {
        self.bindings.read().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl Namespace for Environment {
    fn entries(&self) -> Vec<(String, Value)> {
        self.bindings.read().clone()
    }

    fn rebind(&self, name: &str, value: Value) {
        self.define(name, value);
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}
