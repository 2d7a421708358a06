//! Classes and their method tables
//!
//! A class is a shared object: every handle sees the same method table, so
//! patching a method through one handle is visible through all of them.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::Args;
use super::error::{CallError, CallResult};
use super::function::FunctionRef;
use super::value::{ObjectId, Value};

/// Handle to a class
pub type ClassRef = Arc<Class>;

/// Named class with an ordered, mutable method table
pub struct Class {
    id: ObjectId,
    name: String,
    methods: RwLock<Vec<(String, Value)>>,
}

impl Class {
    /// Class with an empty method table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            methods: RwLock::new(Vec::new()),
        }
    }

    /// Declare a method
    pub fn with_method(self, name: impl Into<String>, method: FunctionRef) -> Self {
        self.with_member(name, Value::Function(method))
    }

    /// Declare an arbitrary member (nested class, constant, ...)
    pub fn with_member(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        let methods = self.methods.get_mut();
        match methods.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => methods.push((name, value)),
        }
        self
    }

    /// Freeze into a shareable handle
    pub fn into_ref(self) -> ClassRef {
        Arc::new(self)
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member bound to `name`
    pub fn method(&self, name: &str) -> Option<Value> {
        self.methods
            .read()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.clone())
    }

    /// Replace (or add) the member bound to `name`, in place
    pub fn set_method(&self, name: &str, value: Value) {
        let mut methods = self.methods.write();
        match methods.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value,
            None => methods.push((name.to_string(), value)),
        }
    }

    /// Snapshot of the member table in declaration order
    pub fn methods(&self) -> Vec<(String, Value)> {
        self.methods.read().clone()
    }

    /// Call the member bound to `name`
    pub fn invoke(&self, name: &str, args: &Args) -> CallResult<Value> {
        match self.method(name) {
            Some(method) => method.call(args),
            None => Err(CallError::NotCallable(format!("{}.{}", self.name, name))),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.methods.read().iter().map(|(name, _)| name.clone()).collect();
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("methods", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::function::{Function, Signature};

    #[test]
    fn test_patch_is_visible_through_every_handle() {
        let area = Function::new("area", Signature::from_names(&["self"]), |_| Ok(Value::Int(1)));
        let class = Class::new("Square").with_method("area", area.clone()).into_ref();
        let alias = class.clone();

        let replacement =
            Function::new("area", Signature::from_names(&["self"]), |_| Ok(Value::Int(2)));
        class.set_method("area", Value::Function(replacement));

        assert_eq!(alias.invoke("area", &Args::new().arg(0)).unwrap(), Value::Int(2));
        class.set_method("area", Value::Function(area.clone()));
        assert!(alias.method("area").unwrap().is_identical(&Value::Function(area)));
    }

    #[test]
    fn test_missing_method() {
        let class = Class::new("Empty").into_ref();
        assert!(matches!(
            class.invoke("nope", &Args::new()),
            Err(CallError::NotCallable(name)) if name == "Empty.nope"
        ));
    }
}
