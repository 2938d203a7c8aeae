// src/generator/mod.rs

//! Synthetic workload generation.
//!
//! - [`profiles`] holds the per-job-type ranges and request subdivision.
//! - [`timing`] maps a drawn status to start/end times.
//! - [`population`] draws the jobs and feeds them to a scheduler.

pub mod population;
pub mod profiles;
pub mod timing;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CloudyError, Result};
use crate::types::{JobType, Status};

pub use population::{PopulationSummary, WorkloadGenerator};
pub use profiles::{JOB_PROFILES, JobProfile};
pub use timing::{JobTiming, TIMING_POLICIES, TimingInput};

pub const MAX_JOBS: u32 = 50_000;
pub const MAX_TASKS_PER_JOB: u32 = 20;
pub const MAX_INSTANCES_PER_TASK: u32 = 10;
/// Cap on `tasks_per_job × instances_per_task`.
pub const MAX_INSTANCES_PER_JOB: u32 = 200;

/// Relative frequency of each initial status, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusWeights {
    pub waiting: u32,
    pub running: u32,
    pub terminated: u32,
    pub failed: u32,
    pub interrupted: u32,
}

impl Default for StatusWeights {
    fn default() -> Self {
        Self {
            waiting: 20,
            running: 30,
            terminated: 35,
            failed: 10,
            interrupted: 5,
        }
    }
}

impl StatusWeights {
    /// Every job starts waiting.
    pub fn all_waiting() -> Self {
        Self {
            waiting: 100,
            running: 0,
            terminated: 0,
            failed: 0,
            interrupted: 0,
        }
    }

    pub fn weight(&self, status: Status) -> u32 {
        match status {
            Status::Waiting => self.waiting,
            Status::Running => self.running,
            Status::Terminated => self.terminated,
            Status::Failed => self.failed,
            Status::Interrupted => self.interrupted,
        }
    }

    pub fn total(&self) -> u32 {
        Status::ALL.iter().map(|s| self.weight(*s)).sum()
    }

    pub fn validate(&self) -> Result<()> {
        let total = self.total();
        if total != 100 {
            return Err(CloudyError::InvalidParameters(format!(
                "status weights must sum to 100 (got {total})"
            )));
        }
        Ok(())
    }
}

/// Knobs that shape the population beyond its size.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPolicy {
    pub status_weights: StatusWeights,
    /// Exponent applied to the uniform submit-time draw; values above 1 pull
    /// submissions toward the reference time.
    pub recency_bias: f64,
    /// Chance that a waiting job depends on other jobs.
    pub dependency_probability: f64,
    pub max_dependencies: u32,
    /// Restrict every job to one type instead of drawing it.
    pub job_type: Option<JobType>,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            status_weights: StatusWeights::default(),
            recency_bias: 2.0,
            dependency_probability: 0.1,
            max_dependencies: 2,
            job_type: None,
        }
    }
}

/// Size and shape of a synthetic workload.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub jobs: u32,
    /// Maximum tasks per job; each job draws 1..=this.
    pub tasks_per_job: u32,
    /// Maximum instances per task; each task draws 1..=this.
    pub instances_per_task: u32,
    pub seed: Option<u64>,
    /// Length of the trailing submission window.
    pub window: TimeDelta,
    /// The "now" submit times are measured back from.
    pub reference_time: DateTime<Utc>,
    pub policy: GenerationPolicy,
}

impl GenerationRequest {
    pub fn new(
        jobs: u32,
        tasks_per_job: u32,
        instances_per_task: u32,
        reference_time: DateTime<Utc>,
    ) -> Self {
        Self {
            jobs,
            tasks_per_job,
            instances_per_task,
            seed: None,
            window: TimeDelta::days(7),
            reference_time,
            policy: GenerationPolicy::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_policy(mut self, policy: GenerationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_counts(self.jobs, self.tasks_per_job, self.instances_per_task)?;

        let invalid = |msg: String| Err(CloudyError::InvalidParameters(msg));
        if self.window <= TimeDelta::zero() {
            return invalid("submission window must be positive".to_string());
        }
        if self.reference_time.checked_sub_signed(self.window).is_none() {
            return invalid(format!(
                "submission window reaches before the earliest representable time from {}",
                self.reference_time
            ));
        }
        let policy = &self.policy;
        if !(policy.recency_bias.is_finite() && policy.recency_bias > 0.0) {
            return invalid(format!(
                "recency_bias must be a positive number (got {})",
                policy.recency_bias
            ));
        }
        if !(0.0..=1.0).contains(&policy.dependency_probability) {
            return invalid(format!(
                "dependency_probability must be within [0, 1] (got {})",
                policy.dependency_probability
            ));
        }
        policy.status_weights.validate()
    }
}

/// Count checks shared by the generator and config validation.
pub fn validate_counts(jobs: u32, tasks_per_job: u32, instances_per_task: u32) -> Result<()> {
    let invalid = |msg: String| Err(CloudyError::InvalidParameters(msg));

    if jobs == 0 || tasks_per_job == 0 || instances_per_task == 0 {
        return invalid(format!(
            "jobs, tasks_per_job and instances_per_task must all be >= 1 \
             (got {jobs}, {tasks_per_job}, {instances_per_task})"
        ));
    }
    if jobs > MAX_JOBS {
        return invalid(format!("jobs must be <= {MAX_JOBS} (got {jobs})"));
    }
    if tasks_per_job > MAX_TASKS_PER_JOB {
        return invalid(format!(
            "tasks_per_job must be <= {MAX_TASKS_PER_JOB} (got {tasks_per_job})"
        ));
    }
    if instances_per_task > MAX_INSTANCES_PER_TASK {
        return invalid(format!(
            "instances_per_task must be <= {MAX_INSTANCES_PER_TASK} (got {instances_per_task})"
        ));
    }
    if tasks_per_job * instances_per_task > MAX_INSTANCES_PER_JOB {
        return invalid(format!(
            "tasks_per_job × instances_per_task must be <= {MAX_INSTANCES_PER_JOB} (got {})",
            tasks_per_job * instances_per_task
        ));
    }
    Ok(())
}
