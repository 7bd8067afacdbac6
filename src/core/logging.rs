// Logging configuration and initialization
//
// Structured logging with tracing: compact console output for development,
// JSON lines for log aggregation.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Env var holding a filter directive (e.g. "debug", "info,bodymeasure_lib=debug")
pub const LOG_FILTER_ENV: &str = "BODYMEASURE_LOG";
/// Env var selecting the output format; "json" switches to JSON lines
pub const LOG_FORMAT_ENV: &str = "BODYMEASURE_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Default log level filter (default: "info")
    pub default_level: String,
    /// Use JSON format for logs (default: false)
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Initialize the global subscriber.
///
/// `BODYMEASURE_LOG` is checked first, then `RUST_LOG`, then the configured default.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let use_json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(config.json_format);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if use_json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        subscriber.with(json_layer).try_init()?;
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .compact();

        subscriber.with(console_layer).try_init()?;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        "Logging initialized"
    );

    Ok(())
}
