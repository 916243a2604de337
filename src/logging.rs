use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SANDGFX_LOG";

/// Initialize structured logging with environment filter.
/// Set SANDGFX_LOG=debug (or trace, info, warn, error) for verbosity control.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
