// src/logging.rs

//! Logging setup for `cloudy` using `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen in this order:
//! 1. `--log-level` on the command line, applied to every target
//! 2. `CLOUDY_LOG`, either a bare level ("debug") or full filter directives
//!    such as `"info,cloudy::scheduler=trace"`
//! 3. `info`
//!
//! Logs go to STDERR; stdout carries only run summaries.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "CLOUDY_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .or_else(|_| EnvFilter::try_new(DEFAULT_DIRECTIVES))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Filter directives for the given CLI flag and `CLOUDY_LOG` value.
///
/// A bare level in the environment is normalised (`"WARNING"` → `"warn"`);
/// anything else is passed through if `EnvFilter` accepts it, and replaced
/// by `info` if not.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_from_log_level(level).to_string().to_lowercase();
    }
    let Some(raw) = env.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_DIRECTIVES.to_string();
    };
    if let Some(level) = parse_level_str(raw) {
        return level.to_string().to_lowercase();
    }
    match EnvFilter::try_new(raw) {
        Ok(_) => raw.to_string(),
        Err(_) => DEFAULT_DIRECTIVES.to_string(),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
