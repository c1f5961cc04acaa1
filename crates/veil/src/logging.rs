//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pick the log level from the `DEBUG` level, `-v` and the config file.
///
/// `DEBUG` ≥ 2 means trace, ≥ 1 (or `-v`) means debug; otherwise the
/// configured level applies.
pub fn resolve_level(debug_level: u8, verbose: bool, config_level: &str) -> String {
    match debug_level {
        2.. => "trace".to_string(),
        1 => "debug".to_string(),
        0 if verbose => "debug".to_string(),
        _ => config_level.to_string(),
    }
}

/// Initialize the logging subsystem.
///
/// # Notes
///
/// - Log output goes to stderr
/// - The RUST_LOG environment variable can override the log level
pub fn init(level: &str, json_format: bool) {
    // Build the filter, respecting RUST_LOG if set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        // JSON format for machine parsing
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty format for humans
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging with configuration from Config.
pub fn init_from_config(
    config: &veil_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
    debug_level: u8,
) {
    let level = resolve_level(debug_level, verbose_override, &config.logging.level);
    let json_format = json_logs_override || config.logging.format == "json";
    init(&level, json_format);
}
