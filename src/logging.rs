//! Tracing subscriber setup shared by the binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Env var switching log output to JSON lines.
pub const LOG_JSON: &str = "CEP_RACE_LOG_JSON";

/// Installs the global subscriber, writing to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to `default_filter`.
pub fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = if std::env::var_os(LOG_JSON).is_some() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
