//! Enforced – scoped runtime enforcement of pre- and postconditions
//!
//! This crate installs contract-checking wrappers into caller-supplied
//! namespaces and removes them again, with:
//! - Transparent pass-through for callables that carry no contract
//! - Exact restoration of every touched binding on deactivation
//! - Stable wrapper identity across repeated activation cycles
//! - A reentrancy guard so conditions may call the function they check
//! - Support for type-dispatching callables and per-class method tables

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Contract enforcement core
pub mod runtime;
/// Logging setup and name resolution helpers
pub mod util;

// Re-export key types for convenience
pub use runtime::{EnforcementConfig, EnforcementScope};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
