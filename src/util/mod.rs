//! Supporting utilities: logging setup and dotted-name resolution.

/// Tracing subscriber installation.
pub mod logging;
/// Resolve `Outer.member` paths through namespaces and classes.
pub mod qualname;

pub use logging::init_tracing;
pub use qualname::{resolve_qualname, walk_qualname};
