//! Contract enforcement runtime and public API
//!
//! This module wires the pieces together: values and namespaces supplied by
//! the caller, conditions supplied by a provider, and the
//! [`EnforcementScope`] that installs and removes contract wrappers.

use serde::{Deserialize, Serialize};

// Submodules
pub mod class;
pub mod condition;
pub mod config;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod function;
pub mod guard;
pub mod provider;
pub mod registry;
pub mod scope;
pub mod value;
pub mod wrapper;

/// Configuration for contract enforcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    /// Enable debug-level logging when no explicit filter is given
    pub debug: bool,

    /// Emit a trace event for every call through a wrapper
    pub trace_calls: bool,

    /// Explicit `tracing` filter directives (overrides `RUST_LOG`)
    pub log_filter: Option<String>,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            debug: false,
            trace_calls: false,
            log_filter: None,
        }
    }
}

// Re-export commonly used types
pub use class::{Class, ClassRef};
pub use condition::{
    ArgumentSnapshot, Bindings, ClassConditions, Condition, Conditions, Evaluate, OLD_BINDING,
    RETURN_BINDING, SourceLocation,
};
pub use dispatch::{DispatchRef, DispatchTable};
pub use environment::{Environment, Namespace};
pub use error::{
    CallError, CallResult, LookupError, LookupResult, PostconditionFailed, PreconditionFailed,
    ScopeError, ScopeResult,
};
pub use function::{Args, BoundArguments, Function, FunctionRef, Parameter, Signature};
pub use provider::{ConditionProvider, ContractCatalog};
pub use scope::{ActiveScope, EnforcementScope, Interceptor};
pub use value::{ObjectId, TypeTag, Value};
