// src/config/model.rs

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::errors::{CloudyError, Result};
use crate::generator::{GenerationPolicy, GenerationRequest, StatusWeights};
use crate::pool::ResourcePool;
use crate::types::{JobType, Resources};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [generation]
/// jobs = 1000
/// tasks_per_job = 5
/// instances_per_task = 3
/// seed = 42
///
/// [simulation]
/// tick_minutes = 5
/// horizon_hours = 24
/// interruption_probability = 0.05
///
/// [status_weights]
/// waiting = 20
/// running = 30
/// terminated = 35
/// failed = 10
/// interrupted = 5
///
/// [cluster]
/// vm_count = 4
/// cpu_cores = 128
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub generation: GenerationSection,

    #[serde(default)]
    pub simulation: SimulationSection,

    #[serde(default)]
    pub status_weights: StatusWeights,

    #[serde(default)]
    pub cluster: ClusterSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub generation: GenerationSection,
    pub simulation: SimulationSection,
    pub status_weights: StatusWeights,
    pub cluster: ClusterSection,
}

impl ConfigFile {
    /// Assemble without validation; only [`TryFrom<RawConfigFile>`] calls this.
    pub(crate) fn new_unchecked(
        generation: GenerationSection,
        simulation: SimulationSection,
        status_weights: StatusWeights,
        cluster: ClusterSection,
    ) -> Self {
        Self {
            generation,
            simulation,
            status_weights,
            cluster,
        }
    }

    /// Generation request for one run. The seed is left to the caller.
    pub fn generation_request(&self, reference_time: DateTime<Utc>) -> GenerationRequest {
        let g = &self.generation;
        GenerationRequest {
            jobs: g.jobs,
            tasks_per_job: g.tasks_per_job,
            instances_per_task: g.instances_per_task,
            seed: g.seed,
            window: TimeDelta::days(i64::from(g.window_days)),
            reference_time,
            policy: GenerationPolicy {
                status_weights: self.status_weights,
                recency_bias: g.recency_bias,
                dependency_probability: g.dependency_probability,
                max_dependencies: g.max_dependencies,
                job_type: g.job_type,
            },
        }
    }

    pub fn tick(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.simulation.tick_minutes))
    }

    pub fn horizon(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.simulation.horizon_hours))
    }

    /// Instant of the last possible tick for a run starting at
    /// `reference_time`. Fails if the clock could leave chrono's range.
    pub fn horizon_end(&self, reference_time: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let end = reference_time.checked_add_signed(self.horizon());
        end.filter(|end| end.checked_add_signed(self.tick()).is_some())
            .ok_or_else(|| {
                CloudyError::ConfigError(format!(
                    "{} hours after {reference_time} is out of range",
                    self.simulation.horizon_hours
                ))
            })
    }
}

/// `[generation]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationSection {
    #[serde(default = "default_jobs")]
    pub jobs: u32,

    /// Maximum tasks per job.
    #[serde(default = "default_tasks_per_job")]
    pub tasks_per_job: u32,

    /// Maximum instances per task.
    #[serde(default = "default_instances_per_task")]
    pub instances_per_task: u32,

    /// Fixed seed; a random one is drawn (and logged) if absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Trailing window, in days, that submit times are drawn from.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    #[serde(default = "default_recency_bias")]
    pub recency_bias: f64,

    #[serde(default = "default_dependency_probability")]
    pub dependency_probability: f64,

    #[serde(default = "default_max_dependencies")]
    pub max_dependencies: u32,

    /// RFC 3339 timestamp used as "now"; the wall clock if absent.
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,

    /// Generate only this job type (e.g. `"web-service"`).
    #[serde(default)]
    pub job_type: Option<JobType>,
}

fn default_jobs() -> u32 {
    1000
}

fn default_tasks_per_job() -> u32 {
    5
}

fn default_instances_per_task() -> u32 {
    3
}

fn default_window_days() -> u32 {
    7
}

fn default_recency_bias() -> f64 {
    2.0
}

fn default_dependency_probability() -> f64 {
    0.1
}

fn default_max_dependencies() -> u32 {
    2
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            tasks_per_job: default_tasks_per_job(),
            instances_per_task: default_instances_per_task(),
            seed: None,
            window_days: default_window_days(),
            recency_bias: default_recency_bias(),
            dependency_probability: default_dependency_probability(),
            max_dependencies: default_max_dependencies(),
            reference_time: None,
            job_type: None,
        }
    }
}

/// `[simulation]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationSection {
    #[serde(default = "default_tick_minutes")]
    pub tick_minutes: u32,

    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: u32,

    /// Per-tick chance that a running instance is interrupted.
    #[serde(default = "default_interruption_probability")]
    pub interruption_probability: f64,
}

fn default_tick_minutes() -> u32 {
    5
}

fn default_horizon_hours() -> u32 {
    24
}

fn default_interruption_probability() -> f64 {
    0.05
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            tick_minutes: default_tick_minutes(),
            horizon_hours: default_horizon_hours(),
            interruption_probability: default_interruption_probability(),
        }
    }
}

/// `[cluster]` section: `vm_count` identical VMs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterSection {
    #[serde(default = "default_vm_count")]
    pub vm_count: u32,

    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: u64,

    #[serde(default = "default_memory_gb")]
    pub memory_gb: u64,

    #[serde(default = "default_gpu")]
    pub gpu: u64,

    #[serde(default = "default_disk_gb")]
    pub disk_gb: u64,
}

fn default_vm_count() -> u32 {
    4
}

fn default_cpu_cores() -> u64 {
    128
}

fn default_memory_gb() -> u64 {
    512
}

fn default_gpu() -> u64 {
    8
}

fn default_disk_gb() -> u64 {
    2560
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            vm_count: default_vm_count(),
            cpu_cores: default_cpu_cores(),
            memory_gb: default_memory_gb(),
            gpu: default_gpu(),
            disk_gb: default_disk_gb(),
        }
    }
}

impl ClusterSection {
    /// Capacity of one VM, or `ConfigError` if a value does not fit the
    /// internal units.
    pub fn vm_capacity(&self) -> Result<Resources> {
        self.memory_gb
            .checked_mul(1024)
            .and_then(|memory_mb| {
                Resources::checked_from_units(self.cpu_cores, memory_mb, self.gpu, self.disk_gb)
            })
            .ok_or_else(|| {
                CloudyError::ConfigError(format!(
                    "[cluster] capacity overflows (cpu_cores = {}, memory_gb = {}, gpu = {})",
                    self.cpu_cores, self.memory_gb, self.gpu
                ))
            })
    }

    pub fn pool(&self) -> Result<ResourcePool> {
        Ok(ResourcePool::uniform(self.vm_count as usize, self.vm_capacity()?))
    }
}
