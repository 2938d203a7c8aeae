// tests/config_loading.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::reference_time;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tempfile::tempdir;

use cloudy::cli::CliArgs;
use cloudy::config::{
    ConfigFile, ConfigSource, RawConfigFile, load_and_validate, load_from_path, load_source,
    locate_config, parse_config,
};
use cloudy::errors::CloudyError;
use cloudy::generator::StatusWeights;
use cloudy::types::{JobType, Resources};
use cloudy::{apply_overrides, output_path, resolve_config, run_seeds};

type TestResult = Result<(), Box<dyn Error>>;

const FULL_CONFIG: &str = r#"
[generation]
jobs = 250
tasks_per_job = 4
instances_per_task = 2
seed = 42
window_days = 3
dependency_probability = 0.25
reference_time = "2024-03-01T12:00:00Z"
job_type = "machine-learning"

[simulation]
tick_minutes = 15
horizon_hours = 48
interruption_probability = 0.01

[status_weights]
waiting = 50
running = 20
terminated = 20
failed = 5
interrupted = 5

[cluster]
vm_count = 2
cpu_cores = 64
memory_gb = 256
gpu = 4
disk_gb = 1000
"#;

#[test]
fn full_config_file_loads() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("cloudy.toml");
    fs::write(&path, FULL_CONFIG)?;

    let cfg = load_and_validate(&path)?;
    let g = &cfg.generation;
    assert_eq!((g.jobs, g.tasks_per_job, g.instances_per_task), (250, 4, 2));
    assert_eq!(g.seed, Some(42));
    assert_eq!(g.reference_time, Some(reference_time()));
    assert_eq!(g.job_type, Some(JobType::MachineLearning));
    assert_eq!(cfg.tick(), TimeDelta::minutes(15));
    assert_eq!(cfg.horizon(), TimeDelta::hours(48));
    assert_eq!(cfg.status_weights.waiting, 50);
    assert_eq!(
        cfg.cluster.vm_capacity()?,
        Resources::from_units(64, 256 * 1024, 4, 1000)
    );
    assert_eq!(cfg.cluster.pool()?.vms().len(), 2);

    let request = cfg.generation_request(reference_time());
    assert_eq!(request.window, TimeDelta::days(3));
    assert_eq!(request.policy.dependency_probability, 0.25);
    request.validate()?;
    Ok(())
}

#[test]
fn empty_file_uses_defaults() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("empty.toml");
    fs::write(&path, "")?;

    let cfg = ConfigFile::try_from(load_from_path(&path)?)?;
    assert_eq!(cfg.generation.jobs, 1000);
    assert_eq!(cfg.generation.tasks_per_job, 5);
    assert_eq!(cfg.generation.instances_per_task, 3);
    assert!(cfg.generation.seed.is_none());
    assert_eq!(cfg.status_weights, StatusWeights::default());
    assert_eq!(cfg.simulation.tick_minutes, 5);
    assert_eq!(cfg.cluster.vm_count, 4);
    Ok(())
}

#[test]
fn partial_status_weights_fill_from_defaults() -> TestResult {
    let raw: RawConfigFile = toml::from_str(
        r#"
        [status_weights]
        waiting = 30
        running = 20
        "#,
    )?;
    // 30 + 20 + 35 + 10 + 5
    assert_eq!(raw.status_weights.total(), 100);
    ConfigFile::try_from(raw)?;
    Ok(())
}

#[test]
fn semantic_errors_are_reported() {
    let mut weights = StatusWeights::default();
    weights.waiting = 0;
    assert!(matches!(
        ConfigFileBuilder::new().status_weights(weights).try_build(),
        Err(CloudyError::InvalidParameters(_))
    ));

    assert!(matches!(
        ConfigFileBuilder::new().tick_minutes(0).try_build(),
        Err(CloudyError::ConfigError(_))
    ));
    assert!(matches!(
        ConfigFileBuilder::new().horizon_hours(0).try_build(),
        Err(CloudyError::ConfigError(_))
    ));
    assert!(matches!(
        ConfigFileBuilder::new().interruption_probability(-0.1).try_build(),
        Err(CloudyError::ConfigError(_))
    ));
    assert!(matches!(
        ConfigFileBuilder::new().vm_count(0).try_build(),
        Err(CloudyError::ConfigError(_))
    ));
    assert!(matches!(
        ConfigFileBuilder::new().shape(20, 11).try_build(),
        Err(CloudyError::InvalidParameters(_))
    ));
    assert!(matches!(
        ConfigFileBuilder::new().jobs(0).try_build(),
        Err(CloudyError::InvalidParameters(_))
    ));

    let mut raw = ConfigFileBuilder::new().raw();
    raw.generation.window_days = 400;
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(CloudyError::ConfigError(_))
    ));
}

#[test]
fn values_that_would_overflow_are_rejected() -> TestResult {
    let rejected = |edit: fn(&mut RawConfigFile)| {
        let mut raw = ConfigFileBuilder::new().raw();
        edit(&mut raw);
        matches!(ConfigFile::try_from(raw), Err(CloudyError::ConfigError(_)))
    };

    assert!(rejected(|raw| raw.cluster.cpu_cores = 100_000_000_000_000_000));
    assert!(rejected(|raw| raw.cluster.memory_gb = u64::MAX / 2));
    assert!(rejected(|raw| raw.cluster.gpu = u64::MAX));
    assert!(rejected(|raw| raw.cluster.disk_gb = u64::MAX));
    assert!(rejected(|raw| raw.cluster.vm_count = u32::MAX));
    assert!(rejected(|raw| raw.simulation.horizon_hours = u32::MAX));
    assert!(rejected(|raw| raw.simulation.tick_minutes = u32::MAX));
    assert!(rejected(|raw| {
        raw.generation.reference_time = Some(DateTime::<Utc>::MAX_UTC - TimeDelta::hours(1));
    }));
    assert!(rejected(|raw| {
        raw.generation.reference_time = Some(DateTime::<Utc>::MIN_UTC);
    }));

    // The largest accepted values still build a cluster and a clock.
    let mut raw = ConfigFileBuilder::new().raw();
    raw.cluster.vm_count = 10_000;
    raw.cluster.cpu_cores = 1_000_000;
    raw.cluster.memory_gb = 1_000_000_000;
    raw.simulation.horizon_hours = 366 * 24;
    let cfg = ConfigFile::try_from(raw)?;
    assert_eq!(cfg.cluster.pool()?.total_capacity().cpu_millis, 10_000_000_000_000);
    assert_eq!(
        cfg.horizon_end(reference_time())?,
        reference_time() + TimeDelta::hours(366 * 24)
    );
    Ok(())
}

#[test]
fn unit_conversion_does_not_panic() {
    assert_eq!(Resources::checked_from_units(u64::MAX, 0, 0, 0), None);
    assert_eq!(Resources::checked_from_units(0, 0, u64::MAX / 999, 0), None);
    assert_eq!(
        Resources::checked_from_units(2, 512, 1, 10),
        Some(Resources::new(2000, 512, 1000, 10))
    );
    assert_eq!(Resources::from_units(u64::MAX, 0, 0, 0).cpu_millis, u64::MAX);
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[generation\njobs = ")?;
    assert!(matches!(
        load_from_path(&path),
        Err(CloudyError::TomlError(_))
    ));
    assert!(matches!(
        load_from_path(dir.path().join("missing.toml")),
        Err(CloudyError::IoError(_))
    ));
    Ok(())
}

#[test]
fn config_lookup_prefers_flag_then_env_then_working_dir() -> TestResult {
    let dir = tempdir()?;
    let flag = dir.path().join("flag.toml");

    assert_eq!(
        locate_config(Some(&flag), Some("env.toml"), dir.path()),
        ConfigSource::Flag(flag.clone())
    );
    assert_eq!(
        locate_config(None, Some(" env.toml "), dir.path()),
        ConfigSource::Env(PathBuf::from("env.toml"))
    );
    // Nothing in the directory yet, and a blank variable counts as unset.
    assert_eq!(locate_config(None, Some("  "), dir.path()), ConfigSource::Defaults);
    assert_eq!(locate_config(None, None, dir.path()), ConfigSource::Defaults);

    let local = dir.path().join("cloudy.toml");
    fs::write(&local, "[generation]\njobs = 12\n")?;
    let source = locate_config(None, None, dir.path());
    assert_eq!(source, ConfigSource::WorkingDir(local.clone()));
    assert_eq!(source.path(), Some(local.as_path()));
    assert_eq!(load_source(&source)?.generation.jobs, 12);

    assert!(load_source(&ConfigSource::Defaults)?.generation.seed.is_none());
    // A named file must exist.
    assert!(matches!(
        load_source(&ConfigSource::Env(dir.path().join("gone.toml"))),
        Err(CloudyError::IoError(_))
    ));
    Ok(())
}

#[test]
fn config_text_parses_without_a_file() -> TestResult {
    let raw = parse_config("[cluster]\nvm_count = 3\n")?;
    assert_eq!(raw.cluster.vm_count, 3);
    assert_eq!(raw.simulation.tick_minutes, 5);
    assert!(matches!(
        parse_config("[cluster]\nvm_count = \"three\"\n"),
        Err(CloudyError::TomlError(_))
    ));
    Ok(())
}

#[test]
fn cli_flags_override_the_file() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("cloudy.toml");
    fs::write(&path, FULL_CONFIG)?;

    let args = CliArgs {
        config: Some(path),
        jobs: Some(10),
        seed: Some(7),
        horizon_hours: Some(2),
        runs: 1,
        ..CliArgs::default()
    };
    let cfg = resolve_config(&args)?;
    assert_eq!(cfg.generation.jobs, 10);
    assert_eq!(cfg.generation.seed, Some(7));
    assert_eq!(cfg.simulation.horizon_hours, 2);
    // Untouched values come from the file.
    assert_eq!(cfg.generation.tasks_per_job, 4);
    assert_eq!(cfg.simulation.tick_minutes, 15);

    let mut raw = RawConfigFile::default();
    let args = CliArgs {
        tasks_per_job: Some(0),
        ..CliArgs::default()
    };
    apply_overrides(&mut raw, &args);
    assert!(ConfigFile::try_from(raw).is_err());
    Ok(())
}

#[test]
fn run_seeds_and_output_paths() {
    assert_eq!(run_seeds(5, 3), vec![5, 6, 7]);
    assert_eq!(run_seeds(u64::MAX, 2), vec![u64::MAX, 0]);
    assert_eq!(run_seeds(9, 0), vec![9]);

    let base = Path::new("out/records.jsonl");
    assert_eq!(output_path(base, 42, false), PathBuf::from("out/records.jsonl"));
    assert_eq!(
        output_path(base, 42, true),
        PathBuf::from("out/records-42.jsonl")
    );
    assert_eq!(
        output_path(Path::new("dump"), 3, true),
        PathBuf::from("dump-3")
    );
}

#[test]
fn bundled_demo_config_is_valid() -> TestResult {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/cloudy.toml");
    let cfg = load_and_validate(path)?;
    assert_eq!(cfg.generation.seed, Some(42));
    assert_eq!(cfg.cluster.vm_count, 8);
    Ok(())
}
