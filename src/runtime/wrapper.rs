//! Per-call contract checking around one callable
//!
//! The call protocol: bypass when the original is already evaluating its own
//! conditions; otherwise bind, snapshot, validate mutable-argument
//! declarations, check preconditions, invoke, check postconditions. The
//! guard is held around each evaluation phase and never around the
//! invocation itself, so genuine recursion is checked on every level.

use std::sync::Arc;
use tracing::{trace, warn};

use super::Args;
use super::condition::{ArgumentSnapshot, Bindings, Conditions};
use super::environment::{Environment, Namespace};
use super::error::{CallResult, PostconditionFailed, PreconditionFailed};
use super::function::{BoundArguments, Function, FunctionRef};
use super::guard::ReentrancyGuard;
use super::value::Value;

/// Contract-checking state for one original callable
pub struct EnforcementWrapper {
    original: FunctionRef,
    target: FunctionRef,
    conditions: Conditions,
    globals: Option<Environment>,
    guard: Arc<ReentrancyGuard>,
    trace_calls: bool,
}

impl EnforcementWrapper {
    /// Wrap `original`, invoking `target` in its place.
    ///
    /// `target` is `original` unless an interception hook substituted it.
    pub fn new(
        original: FunctionRef,
        target: FunctionRef,
        conditions: Conditions,
        globals: Option<Environment>,
        guard: Arc<ReentrancyGuard>,
    ) -> Self {
        Self {
            original,
            target,
            conditions,
            globals,
            guard,
            trace_calls: false,
        }
    }

    /// Emit a trace event for each call
    pub fn with_trace_calls(mut self, trace_calls: bool) -> Self {
        self.trace_calls = trace_calls;
        self
    }

    /// Turn into a callable with the original's name and signature.
    pub fn into_function(self) -> FunctionRef {
        let name = self.original.name().to_string();
        let signature = self.original.signature().clone();
        let state = Arc::new(self);
        Function::new(name, signature, move |args| state.call(args))
    }

    /// Run the call protocol
    pub fn call(&self, args: &Args) -> CallResult<Value> {
        let id = self.original.id();
        if self.guard.is_enforcing(id) {
            return self.original.call(args);
        }
        if self.trace_calls {
            trace!(function = self.original.name(), "enforcing contract");
        }

        let bound = self.conditions.signature.bind(self.original.name(), args)?;
        let snapshot = ArgumentSnapshot::capture(&bound);

        let unrecognized: Vec<String> = self
            .conditions
            .mutable_args
            .iter()
            .filter(|name| !bound.contains(name))
            .cloned()
            .collect();
        if !unrecognized.is_empty() {
            return Err(PostconditionFailed::UnrecognizedMutableArgs {
                names: unrecognized,
            }
            .into());
        }

        {
            let _enforcing = self.guard.enter(id);
            let bindings = self.bindings(&bound);
            for condition in &self.conditions.pre {
                if !condition.evaluate(&bindings)? {
                    warn!(
                        function = self.original.name(),
                        condition = condition.source(),
                        location = %condition.location(),
                        "precondition failed"
                    );
                    return Err(PreconditionFailed {
                        location: condition.location().clone(),
                    }
                    .into());
                }
            }
        }

        let ret = self.target.call(args)?;

        {
            let _enforcing = self.guard.enter(id);
            let bindings = self
                .bindings(&bound)
                .with_return(ret.clone())
                .with_old(snapshot);
            for condition in &self.conditions.post {
                if !condition.evaluate(&bindings)? {
                    warn!(
                        function = self.original.name(),
                        condition = condition.source(),
                        location = %condition.location(),
                        "postcondition failed"
                    );
                    return Err(PostconditionFailed::Violated {
                        location: condition.location().clone(),
                    }
                    .into());
                }
            }
        }

        Ok(ret)
    }

    fn bindings(&self, bound: &BoundArguments) -> Bindings {
        let globals = self
            .globals
            .as_ref()
            .map(Namespace::entries)
            .unwrap_or_default();
        Bindings::for_call(globals, bound)
    }
}
