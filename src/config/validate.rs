// src/config/validate.rs

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CloudyError, Result};

/// Longest accepted submission window.
pub const MAX_WINDOW_DAYS: u32 = 365;
/// Longest accepted simulated span: one leap year.
pub const MAX_HORIZON_HOURS: u32 = 366 * 24;
/// Longest accepted tick: one day.
pub const MAX_TICK_MINUTES: u32 = 24 * 60;
pub const MAX_VM_COUNT: u32 = 10_000;
/// Per-VM limits; with [`MAX_VM_COUNT`] VMs the cluster totals stay far
/// below `u64::MAX` in internal units.
pub const MAX_VM_CPU_CORES: u64 = 1_000_000;
pub const MAX_VM_MEMORY_GB: u64 = 1_000_000_000;
pub const MAX_VM_GPU: u64 = 100_000;
pub const MAX_VM_DISK_GB: u64 = 1_000_000_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CloudyError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.generation,
            raw.simulation,
            raw.status_weights,
            raw.cluster,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_generation(cfg)?;
    validate_simulation(cfg)?;
    validate_cluster(cfg)?;
    Ok(())
}

fn validate_generation(cfg: &RawConfigFile) -> Result<()> {
    let g = &cfg.generation;
    if g.window_days == 0 || g.window_days > MAX_WINDOW_DAYS {
        return Err(CloudyError::ConfigError(format!(
            "[generation].window_days must be within 1..={MAX_WINDOW_DAYS} (got {})",
            g.window_days
        )));
    }
    if let Some(reference_time) = g.reference_time {
        let window = TimeDelta::days(i64::from(g.window_days));
        if reference_time.checked_sub_signed(window).is_none() {
            return Err(CloudyError::ConfigError(format!(
                "[generation].reference_time {reference_time} leaves no room for a {}-day window",
                g.window_days
            )));
        }
    }

    // Counts, policy and status weights share the generator's own checks.
    let candidate = ConfigFile::new_unchecked(
        g.clone(),
        cfg.simulation.clone(),
        cfg.status_weights,
        cfg.cluster.clone(),
    );
    candidate
        .generation_request(DateTime::<Utc>::UNIX_EPOCH)
        .validate()
}

fn validate_simulation(cfg: &RawConfigFile) -> Result<()> {
    let s = &cfg.simulation;
    if s.tick_minutes == 0 || s.tick_minutes > MAX_TICK_MINUTES {
        return Err(CloudyError::ConfigError(format!(
            "[simulation].tick_minutes must be within 1..={MAX_TICK_MINUTES} (got {})",
            s.tick_minutes
        )));
    }
    if s.horizon_hours == 0 || s.horizon_hours > MAX_HORIZON_HOURS {
        return Err(CloudyError::ConfigError(format!(
            "[simulation].horizon_hours must be within 1..={MAX_HORIZON_HOURS} (got {})",
            s.horizon_hours
        )));
    }
    if !(0.0..=1.0).contains(&s.interruption_probability) {
        return Err(CloudyError::ConfigError(format!(
            "[simulation].interruption_probability must be within [0, 1] (got {})",
            s.interruption_probability
        )));
    }
    if let Some(reference_time) = cfg.generation.reference_time {
        let candidate = ConfigFile::new_unchecked(
            cfg.generation.clone(),
            s.clone(),
            cfg.status_weights,
            cfg.cluster.clone(),
        );
        candidate.horizon_end(reference_time)?;
    }
    Ok(())
}

fn validate_cluster(cfg: &RawConfigFile) -> Result<()> {
    let c = &cfg.cluster;
    if c.vm_count == 0 || c.vm_count > MAX_VM_COUNT {
        return Err(CloudyError::ConfigError(format!(
            "[cluster].vm_count must be within 1..={MAX_VM_COUNT} (got {})",
            c.vm_count
        )));
    }
    if c.cpu_cores == 0 || c.memory_gb == 0 {
        return Err(CloudyError::ConfigError(format!(
            "[cluster] VMs need CPU and memory (got cpu_cores = {}, memory_gb = {})",
            c.cpu_cores, c.memory_gb
        )));
    }

    let limits = [
        ("cpu_cores", c.cpu_cores, MAX_VM_CPU_CORES),
        ("memory_gb", c.memory_gb, MAX_VM_MEMORY_GB),
        ("gpu", c.gpu, MAX_VM_GPU),
        ("disk_gb", c.disk_gb, MAX_VM_DISK_GB),
    ];
    for (key, value, max) in limits {
        if value > max {
            return Err(CloudyError::ConfigError(format!(
                "[cluster].{key} must be <= {max} (got {value})"
            )));
        }
    }
    c.vm_capacity()?;
    Ok(())
}
