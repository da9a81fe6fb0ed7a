//! # Observability Infrastructure
//!
//! Structured logging for the translator. There is no metrics or tracing
//! export: a translation is a single short-lived call and its log lines are the
//! whole story.

pub mod logging;

pub use logging::log_config_info;

use crate::config::{LogFormat, ObservabilityConfig};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level is used, raised to
/// `debug` when `verbose` is requested. A subscriber installed earlier (for
/// example by a test harness) is left in place.
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let result = match config.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if result.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
}
