// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod export;
pub mod generator;
pub mod injector;
pub mod logging;
pub mod model;
pub mod pool;
pub mod report;
pub mod scheduler;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{CONFIG_ENV, ConfigFile, RawConfigFile, load_source, locate_config};
use crate::engine::{SimulationReport, run_many};
use crate::export::{JsonLinesSink, write_all};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - seed selection for one or more runs
/// - parallel simulation
/// - summaries on stdout and optional JSON-lines export
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let reference_time = cfg.generation.reference_time.unwrap_or_else(Utc::now);
    let base_seed = match cfg.generation.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random::<u64>();
            info!(seed, "no seed configured; drew one");
            seed
        }
    };
    let seeds = run_seeds(base_seed, args.runs);
    let multi = seeds.len() > 1;

    let reports = run_many(cfg, seeds, reference_time).await?;

    for report in &reports {
        print_summary(report);
        if let Some(ref out) = args.output {
            let path = output_path(out, report.seed, multi);
            let mut sink = JsonLinesSink::create(&path)?;
            let written = write_all(&mut sink, &report.records)?;
            info!(path = %path.display(), records = written, "records exported");
        }
    }

    Ok(())
}

/// Load the config (explicit path, `cloudy.toml`, or defaults), apply CLI
/// overrides, then validate.
pub fn resolve_config(args: &CliArgs) -> crate::errors::Result<ConfigFile> {
    let env = std::env::var(CONFIG_ENV).ok();
    let source = locate_config(args.config.as_deref(), env.as_deref(), Path::new("."));
    debug!(?source, "configuration source");
    let mut raw = load_source(&source)?;
    apply_overrides(&mut raw, args);
    ConfigFile::try_from(raw)
}

/// CLI values win over the file.
pub fn apply_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    let g = &mut raw.generation;
    if let Some(jobs) = args.jobs {
        g.jobs = jobs;
    }
    if let Some(tasks) = args.tasks_per_job {
        g.tasks_per_job = tasks;
    }
    if let Some(instances) = args.instances_per_task {
        g.instances_per_task = instances;
    }
    if let Some(seed) = args.seed {
        g.seed = Some(seed);
    }
    if let Some(days) = args.window_days {
        g.window_days = days;
    }
    if let Some(hours) = args.horizon_hours {
        raw.simulation.horizon_hours = hours;
    }
}

/// `runs` consecutive seeds starting at `base`.
pub fn run_seeds(base: u64, runs: u64) -> Vec<u64> {
    (0..runs.max(1)).map(|i| base.wrapping_add(i)).collect()
}

/// Export path for one run; with several runs the seed goes into the stem,
/// e.g. `out.jsonl` → `out-42.jsonl`.
pub fn output_path(base: &Path, seed: u64, multi: bool) -> PathBuf {
    if !multi {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "records".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{stem}-{seed}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{seed}"),
    };
    base.with_file_name(name)
}

fn print_summary(report: &SimulationReport) {
    let stats = &report.stats;
    println!("cloudy run (seed {})", report.seed);
    println!("  ticks: {}", report.ticks);
    println!(
        "  population: {} generated, {} queued, {} adopted, {} demoted, {} historical, {} rejected",
        report.population.generated,
        report.population.queued,
        report.population.adopted,
        report.population.demoted,
        report.population.historical,
        report.population.rejected.len()
    );
    println!("  jobs: {}  instances: {}", stats.total_jobs, stats.total_instances);
    println!("  allocated: {}", stats.total_allocated);
    println!("  peak usage: {}", stats.total_peak_usage);

    let statuses: Vec<String> = report
        .status_summary
        .iter()
        .map(|(status, count)| format!("{status}={count}"))
        .collect();
    println!("  job statuses: {}", statuses.join(" "));

    let types: Vec<String> = stats
        .job_types
        .iter()
        .map(|(job_type, count)| format!("{job_type}={count}"))
        .collect();
    println!("  job types: {}", types.join(" "));

    if let Some(peak) = stats.timeline.iter().max_by_key(|p| p.active_jobs) {
        println!(
            "  peak: {} active jobs at {} (allocated {}; used {})",
            peak.active_jobs, peak.time, peak.usage, peak.used
        );
    }
    println!("  fingerprint: {}", report.fingerprint);
    println!();
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    let g = &cfg.generation;
    let s = &cfg.simulation;
    let w = &cfg.status_weights;
    let c = &cfg.cluster;

    println!("cloudy dry-run");
    println!(
        "  generation: jobs={} tasks_per_job={} instances_per_task={} window_days={}",
        g.jobs, g.tasks_per_job, g.instances_per_task, g.window_days
    );
    match g.seed {
        Some(seed) => println!("  seed: {seed}"),
        None => println!("  seed: random"),
    }
    println!(
        "  policy: recency_bias={} dependency_probability={} max_dependencies={}",
        g.recency_bias, g.dependency_probability, g.max_dependencies
    );
    println!(
        "  status weights: waiting={} running={} terminated={} failed={} interrupted={}",
        w.waiting, w.running, w.terminated, w.failed, w.interrupted
    );
    println!(
        "  simulation: tick={}m horizon={}h interruption_probability={}",
        s.tick_minutes, s.horizon_hours, s.interruption_probability
    );
    match c.vm_capacity() {
        Ok(capacity) => println!("  cluster: {} × [{capacity}]", c.vm_count),
        Err(err) => println!("  cluster: {err}"),
    }

    debug!("dry-run complete (no simulation)");
}
