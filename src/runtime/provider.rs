//! Condition providers
//!
//! The scope asks a [`ConditionProvider`] which contracts a callable or class
//! carries. [`ContractCatalog`] is an in-memory provider for embedders that
//! build their conditions programmatically.

use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::class::ClassRef;
use super::condition::{ClassConditions, Conditions};
use super::environment::Environment;
use super::function::FunctionRef;
use super::value::ObjectId;

/// Source of contracts for callables and classes.
pub trait ConditionProvider: Send + Sync {
    /// Conditions declared on `function`; empty when it has none
    fn conditions_for(&self, function: &FunctionRef) -> Result<Conditions>;

    /// Per-method conditions declared on `class`
    fn class_conditions_for(&self, class: &ClassRef) -> Result<ClassConditions>;

    /// Bindings visible where `function` was defined.
    ///
    /// The handle is read at each evaluation, so conditions see the live
    /// state of the defining namespace.
    fn globals_for(&self, function: &FunctionRef) -> Option<Environment>;
}

/// In-memory catalog of contracts keyed by object identity.
#[derive(Default)]
pub struct ContractCatalog {
    functions: RwLock<HashMap<ObjectId, Conditions>>,
    classes: RwLock<HashMap<ObjectId, ClassConditions>>,
    globals: RwLock<HashMap<ObjectId, Environment>>,
    default_globals: RwLock<Option<Environment>>,
}

impl ContractCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register conditions for a function, replacing earlier ones.
    pub fn register_function(&self, function: &FunctionRef, conditions: Conditions) {
        self.functions.write().insert(function.id(), conditions);
    }

    /// Register conditions for every listed method of a class.
    pub fn register_class(&self, class: &ClassRef, conditions: ClassConditions) {
        self.classes.write().insert(class.id(), conditions);
    }

    /// Register conditions for a single method of a class.
    pub fn register_method(&self, class: &ClassRef, method: &str, conditions: Conditions) {
        self.classes
            .write()
            .entry(class.id())
            .or_default()
            .insert(method, conditions);
    }

    /// Defining-scope bindings for one function
    pub fn register_globals(&self, function: &FunctionRef, globals: Environment) {
        self.globals.write().insert(function.id(), globals);
    }

    /// Defining-scope bindings for functions without their own entry
    pub fn set_default_globals(&self, globals: Environment) {
        *self.default_globals.write() = Some(globals);
    }

    /// Number of functions with registered conditions
    pub fn function_count(&self) -> usize {
        self.functions.read().len()
    }
}

impl ConditionProvider for ContractCatalog {
    fn conditions_for(&self, function: &FunctionRef) -> Result<Conditions> {
        Ok(self
            .functions
            .read()
            .get(&function.id())
            .cloned()
            .unwrap_or_else(|| Conditions::new(function.signature().clone())))
    }

    fn class_conditions_for(&self, class: &ClassRef) -> Result<ClassConditions> {
        Ok(self.classes.read().get(&class.id()).cloned().unwrap_or_default())
    }

    fn globals_for(&self, function: &FunctionRef) -> Option<Environment> {
        self.globals
            .read()
            .get(&function.id())
            .cloned()
            .or_else(|| self.default_globals.read().clone())
    }
}
