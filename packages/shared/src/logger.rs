//! Logging setup utilities for the discraft bridge.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Sets up logging for the bridge library crate and the binary. The log level
/// can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "discraft-bridge")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use discraft_shared::logger::setup_logger;
///
/// setup_logger("discraft-bridge", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                default_filter(binary_name, default_log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
///
/// Crate targets use underscores, so dashes in both names are normalized.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "discraft_bridge={level},discraft_shared={level},{bin}={level},tower_http=warn",
        level = default_log_level,
        bin = binary_name.replace('-', "_"),
    )
}
