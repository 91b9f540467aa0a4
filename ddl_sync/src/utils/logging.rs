//! Logging utilities for ddl_sync
//!
//! This module provides logging setup and configuration.

use std::fs::File;
use std::path::Path;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize logging based on configuration.
///
/// Without a configuration, a text subscriber at `info` writes to stderr so
/// stdout stays reserved for generated SQL.
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let default_config = LoggingConfig::default();
    let config = config.as_ref().unwrap_or(&default_config);

    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let directive = format!("ddl_sync={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log level: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.eq_ignore_ascii_case("json");

    let result = match (&config.file, json) {
        (Some(file_path), json) => {
            if let Some(parent) = Path::new(file_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(file_path)?;
            let builder = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(file);

            if json {
                tracing::subscriber::set_global_default(builder.json().finish())
            } else {
                tracing::subscriber::set_global_default(builder.finish())
            }
        }
        (None, true) => tracing::subscriber::set_global_default(
            fmt::Subscriber::builder()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
        (None, false) => tracing::subscriber::set_global_default(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    };

    result.map_err(|e| Error::ConfigError(format!("Logging already initialized: {}", e)))
}
