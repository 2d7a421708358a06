//! Error types for contract enforcement
//!
//! Domain errors use thiserror. Provider failures arrive as `anyhow::Error`
//! and are wrapped at the scope boundary.

use thiserror::Error;

use super::condition::SourceLocation;

/// A precondition evaluated false; the implementation never ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Precondition failed at {location}")]
pub struct PreconditionFailed {
    /// Where the failing condition was declared
    pub location: SourceLocation,
}

/// Postcondition-category failures.
///
/// A mutable-argument declaration that names no bound parameter is reported
/// under this kind as well, before the implementation is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostconditionFailed {
    /// A postcondition evaluated false after a normal return
    #[error("Postcondition failed at {location}")]
    Violated {
        /// Where the failing condition was declared
        location: SourceLocation,
    },

    /// Declared mutable arguments that are not parameters of the callable
    #[error("Unrecognized mutable argument(s) in postcondition: \"{}\"", names.join(","))]
    UnrecognizedMutableArgs {
        /// Offending names, sorted
        names: Vec<String>,
    },
}

impl PostconditionFailed {
    /// Source location of the failing condition, when there is one.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            PostconditionFailed::Violated { location } => Some(location),
            PostconditionFailed::UnrecognizedMutableArgs { .. } => None,
        }
    }
}

/// Failures surfaced by calling a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// Contract precondition violated
    #[error(transparent)]
    Precondition(#[from] PreconditionFailed),

    /// Contract postcondition violated
    #[error(transparent)]
    Postcondition(#[from] PostconditionFailed),

    /// Arguments could not be bound against the call signature
    #[error("cannot bind arguments for {function}: {detail}")]
    Binding {
        /// Callable being invoked
        function: String,
        /// What went wrong
        detail: String,
    },

    /// The value is not callable, or a named member does not exist
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// Failure raised by an implementation or an expression
    #[error("{0}")]
    Raised(String),
}

impl CallError {
    /// Build an implementation-level failure.
    pub fn raised(message: impl Into<String>) -> Self {
        CallError::Raised(message.into())
    }

    /// True for precondition failures.
    pub fn is_precondition(&self) -> bool {
        matches!(self, CallError::Precondition(_))
    }

    /// True for postcondition failures, including unrecognized mutable arguments.
    pub fn is_postcondition(&self) -> bool {
        matches!(self, CallError::Postcondition(_))
    }
}

/// Convenience result alias for calls
pub type CallResult<T> = std::result::Result<T, CallError>;

/// Scope activation errors
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The condition provider failed for a callable or class
    #[error("condition provider failed for '{target}': {source}")]
    Provider {
        /// Name of the callable or class being inspected
        target: String,
        /// Provider error
        #[source]
        source: anyhow::Error,
    },

    /// `activate` was called on a scope that is already active
    #[error("enforcement scope is already active")]
    AlreadyActive,
}

/// Convenience result alias for scope operations
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// Dotted-name resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// A path segment does not exist
    #[error("Name \"{0}\" not found")]
    NotFound(String),

    /// The path goes through a function-local definition
    #[error("objects defined inline are non-addressable ({0})")]
    NonAddressable(String),
}

/// Convenience result alias for name lookups
pub type LookupResult<T> = std::result::Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_location() {
        let location = SourceLocation::new("shapes.rs", 12);
        let pre = CallError::from(PreconditionFailed {
            location: location.clone(),
        });
        assert_eq!(pre.to_string(), "Precondition failed at shapes.rs:12");
        assert!(pre.is_precondition());

        let post = CallError::from(PostconditionFailed::Violated { location });
        assert_eq!(post.to_string(), "Postcondition failed at shapes.rs:12");
        assert!(post.is_postcondition());
    }

    #[test]
    fn test_unrecognized_mutable_args_is_postcondition_kind() {
        let err = CallError::from(PostconditionFailed::UnrecognizedMutableArgs {
            names: vec!["a".into(), "b".into()],
        });
        assert!(err.is_postcondition());
        assert_eq!(
            err.to_string(),
            "Unrecognized mutable argument(s) in postcondition: \"a,b\""
        );
    }
}
