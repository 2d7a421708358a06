//! Contract conditions and their evaluation environment
//!
//! Conditions are produced by a [`ConditionProvider`](super::provider::ConditionProvider)
//! as ready-made data. Expression evaluation stays behind the [`Evaluate`]
//! trait; this crate never parses contract syntax.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::error::{CallError, CallResult};
use super::function::{BoundArguments, Signature};
use super::value::Value;

/// Reserved binding name for a call's return value
pub const RETURN_BINDING: &str = "__return__";

/// Reserved binding name for the pre-call argument snapshot
pub const OLD_BINDING: &str = "__old__";

/// Where a condition was declared
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file
    pub file: String,
    /// 1-based line
    pub line: u32,
}

impl SourceLocation {
    /// Create a location
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Boolean expression evaluated against a [`Bindings`] environment.
pub trait Evaluate: Send + Sync {
    /// Evaluate to true or false; errors propagate to the caller unchanged.
    fn evaluate(&self, bindings: &Bindings) -> CallResult<bool>;
}

impl<F> Evaluate for F
where
    F: Fn(&Bindings) -> CallResult<bool> + Send + Sync,
{
    fn evaluate(&self, bindings: &Bindings) -> CallResult<bool> {
        self(bindings)
    }
}

/// A single pre- or postcondition
#[derive(Clone)]
pub struct Condition {
    expr: Arc<dyn Evaluate>,
    source: String,
    location: SourceLocation,
}

impl Condition {
    /// Create a condition from a closure, its source text and location
    pub fn new<F>(source: impl Into<String>, location: SourceLocation, expr: F) -> Self
    where
        F: Fn(&Bindings) -> CallResult<bool> + Send + Sync + 'static,
    {
        Self::with_evaluator(source, location, expr)
    }

    /// Create a condition backed by any [`Evaluate`] implementation
    pub fn with_evaluator<E>(source: impl Into<String>, location: SourceLocation, expr: E) -> Self
    where
        E: Evaluate + 'static,
    {
        Self {
            expr: Arc::new(expr),
            source: source.into(),
            location,
        }
    }

    /// Expression source text, for diagnostics
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Declaration site
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Evaluate against `bindings`
    pub fn evaluate(&self, bindings: &Bindings) -> CallResult<bool> {
        self.expr.evaluate(bindings)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("source", &self.source)
            .field("location", &self.location)
            .finish()
    }
}

/// Everything known about one callable's contract
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    /// Signature used to bind arguments
    pub signature: Signature,
    /// Preconditions in declaration order
    pub pre: Vec<Condition>,
    /// Postconditions in declaration order
    pub post: Vec<Condition>,
    /// Parameters whose pre-call state postconditions may inspect
    pub mutable_args: BTreeSet<String>,
}

impl Conditions {
    /// No conditions yet, bound with `signature`
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            ..Self::default()
        }
    }

    /// Add a precondition
    pub fn require(mut self, condition: Condition) -> Self {
        self.pre.push(condition);
        self
    }

    /// Add a postcondition
    pub fn ensure(mut self, condition: Condition) -> Self {
        self.post.push(condition);
        self
    }

    /// Declare a mutable argument
    pub fn mutable(mut self, name: impl Into<String>) -> Self {
        self.mutable_args.insert(name.into());
        self
    }

    /// Whether there is at least one condition to check
    pub fn has_any(&self) -> bool {
        !self.pre.is_empty() || !self.post.is_empty()
    }
}

/// Per-method conditions of a class, keyed by method name
#[derive(Debug, Clone, Default)]
pub struct ClassConditions {
    methods: BTreeMap<String, Conditions>,
}

impl ClassConditions {
    /// No method conditions
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach conditions to `method`
    pub fn with_method(mut self, method: impl Into<String>, conditions: Conditions) -> Self {
        self.methods.insert(method.into(), conditions);
        self
    }

    /// Insert or replace conditions for `method`
    pub fn insert(&mut self, method: impl Into<String>, conditions: Conditions) {
        self.methods.insert(method.into(), conditions);
    }

    /// Conditions for `method`
    pub fn method(&self, method: &str) -> Option<&Conditions> {
        self.methods.get(method)
    }

    /// Whether any method carries a condition
    pub fn has_any(&self) -> bool {
        self.methods.values().any(Conditions::has_any)
    }
}

/// Shallow copies of every bound argument, taken just before invocation
#[derive(Debug, Clone, Default)]
pub struct ArgumentSnapshot {
    values: Vec<(String, Value)>,
}

impl ArgumentSnapshot {
    /// Snapshot every bound parameter, not only the declared-mutable ones
    pub fn capture(bound: &BoundArguments) -> Self {
        Self {
            values: bound
                .iter()
                .map(|(name, value)| (name.to_string(), value.shallow_copy()))
                .collect(),
        }
    }

    /// Pre-call copy of `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    /// Snapshot as a map value
    pub fn to_value(&self) -> Value {
        Value::map(self.values.iter().cloned().collect())
    }
}

/// Name → value environment a condition is evaluated in
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    names: HashMap<String, Value>,
    return_value: Option<Value>,
    old: Option<ArgumentSnapshot>,
}

impl Bindings {
    /// Empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Defining-scope bindings overlaid with the call's bound arguments
    pub fn for_call(globals: Vec<(String, Value)>, bound: &BoundArguments) -> Self {
        let mut names: HashMap<String, Value> = globals.into_iter().collect();
        for (name, value) in bound.iter() {
            names.insert(name.to_string(), value.clone());
        }
        Self {
            names,
            return_value: None,
            old: None,
        }
    }

    /// Bind a name
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.names.insert(name.into(), value);
    }

    /// Attach the call's return value
    pub fn with_return(mut self, value: Value) -> Self {
        self.return_value = Some(value);
        self
    }

    /// Attach the pre-call argument snapshot
    pub fn with_old(mut self, snapshot: ArgumentSnapshot) -> Self {
        self.old = Some(snapshot);
        self
    }

    /// Look up `name`; the reserved names resolve to the return value and snapshot.
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            RETURN_BINDING if self.return_value.is_some() => self.return_value.clone(),
            OLD_BINDING if self.old.is_some() => self.old.as_ref().map(ArgumentSnapshot::to_value),
            _ => self.names.get(name).cloned(),
        }
    }

    /// Like [`Bindings::get`], failing the way an unbound name does
    pub fn value(&self, name: &str) -> CallResult<Value> {
        self.get(name)
            .ok_or_else(|| CallError::raised(format!("name '{name}' is not defined")))
    }

    /// Integer bound to `name`
    pub fn int(&self, name: &str) -> CallResult<i64> {
        self.value(name)?
            .as_int()
            .ok_or_else(|| CallError::raised(format!("'{name}' is not an int")))
    }

    /// The call's return value (postconditions only)
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Pre-call copy of argument `name` (postconditions only)
    pub fn old(&self, name: &str) -> Option<&Value> {
        self.old.as_ref().and_then(|snapshot| snapshot.get(name))
    }
}
