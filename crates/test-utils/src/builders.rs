#![allow(dead_code)]

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use cloudy::config::{ConfigFile, RawConfigFile};
use cloudy::errors::Result;
use cloudy::generator::StatusWeights;
use cloudy::model::{JobSpec, TaskSpec};
use cloudy::pool::ResourcePool;
use cloudy::types::{JobId, JobType, Resources, Status};

use crate::reference_time;

/// Split `total` into `parts` near-equal shares; the last takes the remainder.
pub fn split_evenly(total: Resources, parts: usize) -> Vec<Resources> {
    let parts = parts.max(1);
    let n = parts as u64;
    let each = Resources::from_dimensions(total.dimensions().map(|d| d / n));
    let mut shares = vec![each; parts - 1];
    let used: Resources = shares.iter().sum();
    shares.push(total.saturating_sub(&used));
    shares
}

/// Builder for `JobSpec` to simplify test setup.
///
/// Defaults: priority 1, web-service, submitted at [`reference_time`],
/// waiting, no dependencies. A job built without tasks gets one 1-core task
/// with a single instance running for an hour.
pub struct JobSpecBuilder {
    spec: JobSpec,
}

impl JobSpecBuilder {
    pub fn new(id: u32) -> Self {
        Self {
            spec: JobSpec {
                id: JobId(id),
                priority: 1,
                job_type: JobType::WebService,
                submit_time: reference_time(),
                status: Status::Waiting,
                start_time: None,
                end_time: None,
                depends_on: BTreeSet::new(),
                tasks: Vec::new(),
            },
        }
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.spec.priority = priority;
        self
    }

    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.spec.job_type = job_type;
        self
    }

    pub fn submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.spec.submit_time = at;
        self
    }

    pub fn depends_on(mut self, id: u32) -> Self {
        self.spec.depends_on.insert(JobId(id));
        self
    }

    /// Task whose request is split evenly over `instances`.
    pub fn task(mut self, request: Resources, instances: usize, duration: TimeDelta) -> Self {
        self.spec.tasks.push(TaskSpec {
            kind: "work".to_string(),
            request,
            start_offset: TimeDelta::zero(),
            duration,
            instances: split_evenly(request, instances),
        });
        self
    }

    /// Single-instance task needing only CPU.
    pub fn cpu_task(self, cores: u64, duration: TimeDelta) -> Self {
        self.task(Resources::from_units(cores, 0, 0, 0), 1, duration)
    }

    /// Created running since `start`.
    pub fn running_since(mut self, start: DateTime<Utc>) -> Self {
        self.spec.status = Status::Running;
        self.spec.start_time = Some(start);
        self.spec.end_time = None;
        self
    }

    /// Created in a terminal state with fixed history.
    pub fn finished(mut self, status: Status, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.spec.status = status;
        self.spec.start_time = Some(start);
        self.spec.end_time = Some(end);
        self
    }

    pub fn build(mut self) -> JobSpec {
        if self.spec.tasks.is_empty() {
            self = self.cpu_task(1, TimeDelta::hours(1));
        }
        self.spec
    }
}

/// Builder for a `ResourcePool`.
#[derive(Default)]
pub struct ClusterBuilder {
    vms: Vec<Resources>,
}

impl ClusterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vm(mut self, capacity: Resources) -> Self {
        self.vms.push(capacity);
        self
    }

    pub fn vms(mut self, count: usize, capacity: Resources) -> Self {
        self.vms.extend(std::iter::repeat_n(capacity, count));
        self
    }

    /// VM with `cores` CPUs and ample memory, GPU and disk.
    pub fn cpu_vm(self, cores: u64) -> Self {
        self.vm(Resources::from_units(cores, 1024 * 1024, 64, 100_000))
    }

    pub fn build(self) -> ResourcePool {
        ResourcePool::new(self.vms)
    }
}

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from defaults with a fixed seed and reference time so runs are
/// reproducible.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.generation.seed = Some(7);
        config.generation.reference_time = Some(reference_time());
        Self { config }
    }

    pub fn jobs(mut self, jobs: u32) -> Self {
        self.config.generation.jobs = jobs;
        self
    }

    pub fn shape(mut self, tasks_per_job: u32, instances_per_task: u32) -> Self {
        self.config.generation.tasks_per_job = tasks_per_job;
        self.config.generation.instances_per_task = instances_per_task;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.generation.seed = Some(seed);
        self
    }

    pub fn dependency_probability(mut self, p: f64) -> Self {
        self.config.generation.dependency_probability = p;
        self
    }

    pub fn status_weights(mut self, weights: StatusWeights) -> Self {
        self.config.status_weights = weights;
        self
    }

    pub fn horizon_hours(mut self, hours: u32) -> Self {
        self.config.simulation.horizon_hours = hours;
        self
    }

    pub fn tick_minutes(mut self, minutes: u32) -> Self {
        self.config.simulation.tick_minutes = minutes;
        self
    }

    pub fn interruption_probability(mut self, p: f64) -> Self {
        self.config.simulation.interruption_probability = p;
        self
    }

    pub fn vm_count(mut self, count: u32) -> Self {
        self.config.cluster.vm_count = count;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
