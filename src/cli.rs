// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cloudy`.
///
/// Every generation/simulation flag overrides the matching config value.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "cloudy",
    version,
    about = "Simulate a priority- and dependency-aware cloud workload scheduler.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `$CLOUDY_CONFIG` is read, then `cloudy.toml` when present,
    /// otherwise defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of jobs to generate.
    #[arg(long, value_name = "N")]
    pub jobs: Option<u32>,

    /// Maximum tasks per job.
    #[arg(long, value_name = "N")]
    pub tasks_per_job: Option<u32>,

    /// Maximum instances per task.
    #[arg(long, value_name = "N")]
    pub instances_per_task: Option<u32>,

    /// Seed for the first run; further runs use seed + 1, seed + 2, ...
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Trailing submission window in days.
    #[arg(long, value_name = "DAYS")]
    pub window_days: Option<u32>,

    /// How long to simulate, in hours.
    #[arg(long, value_name = "HOURS")]
    pub horizon_hours: Option<u32>,

    /// Number of independent runs, executed in parallel.
    #[arg(long, value_name = "N", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub runs: u64,

    /// Write instance records as JSON lines. With several runs, the seed is
    /// appended to the file stem.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CLOUDY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the effective configuration without simulating.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
