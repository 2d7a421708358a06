//! Tracing subscriber setup driven by [`EnforcementConfig`].

use tracing_subscriber::EnvFilter;

use crate::runtime::EnforcementConfig;

/// Build the filter implied by `config`.
///
/// Explicit `log_filter` directives win, then `RUST_LOG`, then `debug` or
/// `info` depending on `config.debug`.
pub fn env_filter(config: &EnforcementConfig) -> EnvFilter {
    let fallback = if config.debug { "debug" } else { "info" };
    match &config.log_filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    }
}

/// Install a formatting subscriber writing to stderr.
///
/// Returns false when a global subscriber was already set; calling this more
/// than once is harmless.
pub fn init_tracing(config: &EnforcementConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
