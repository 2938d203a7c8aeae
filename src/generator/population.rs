// src/generator/population.rs

use std::collections::BTreeSet;

use chrono::TimeDelta;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{CloudyError, Result};
use crate::generator::GenerationRequest;
use crate::generator::profiles::{JOB_PROFILES, profile, subdivide};
use crate::generator::timing::{TimingInput, timing_for};
use crate::model::{JobSpec, TaskSpec};
use crate::scheduler::{Admission, Scheduler};
use crate::types::{JobId, Status};

/// What happened to a generated population on submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulationSummary {
    pub generated: usize,
    pub queued: usize,
    pub adopted: usize,
    pub demoted: usize,
    pub historical: usize,
    /// Jobs not admitted because their dependencies would close a cycle.
    pub rejected: Vec<JobId>,
}

/// Draws a reproducible synthetic workload from a [`GenerationRequest`].
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    request: GenerationRequest,
    seed: u64,
    rng: StdRng,
    type_dist: WeightedIndex<u32>,
    status_dist: WeightedIndex<u32>,
}

impl WorkloadGenerator {
    pub fn new(request: GenerationRequest) -> Result<Self> {
        request.validate()?;

        let seed = match request.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                info!(seed, "no seed given; drew one");
                seed
            }
        };

        let type_dist = WeightedIndex::new(JOB_PROFILES.iter().map(|p| p.weight))
            .map_err(|e| CloudyError::InvalidParameters(format!("job type weights: {e}")))?;
        let weights = request.policy.status_weights;
        let status_dist = WeightedIndex::new(Status::ALL.iter().map(|s| weights.weight(*s)))
            .map_err(|e| CloudyError::InvalidParameters(format!("status weights: {e}")))?;

        Ok(Self {
            request,
            seed,
            rng: StdRng::seed_from_u64(seed),
            type_dist,
            status_dist,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Draw every job of the population, ids `0..jobs`.
    pub fn generate(&mut self) -> Vec<JobSpec> {
        (0..self.request.jobs).map(|id| self.job(JobId(id))).collect()
    }

    fn job(&mut self, id: JobId) -> JobSpec {
        let request = &self.request;
        let profile = match request.policy.job_type {
            Some(job_type) => profile(job_type),
            None => &JOB_PROFILES[self.type_dist.sample(&mut self.rng)],
        };
        let priority = self.rng.gen_range(1..=5);

        let u: f64 = self.rng.gen_range(0.0..1.0);
        let back = request.window.num_seconds() as f64 * u.powf(request.policy.recency_bias);
        let submit_time = request.reference_time - TimeDelta::seconds(back as i64);

        let status = Status::ALL[self.status_dist.sample(&mut self.rng)];
        let planned = TimeDelta::minutes(profile.sample_duration_minutes(&mut self.rng));
        let timing = timing_for(
            status,
            &TimingInput {
                now: request.reference_time,
                submit_time,
                planned,
            },
            &mut self.rng,
        );

        let total = profile.sample_request(&mut self.rng);
        let task_count = self.rng.gen_range(1..=request.tasks_per_job) as usize;
        let max_instances = request.instances_per_task;

        let mut tasks = Vec::with_capacity(task_count);
        for task_request in subdivide(total, task_count, &mut self.rng) {
            let instance_count = self.rng.gen_range(1..=max_instances) as usize;
            let offset_cap = (planned / 10).num_seconds();
            let scale: f64 = self.rng.gen_range(0.8..=1.2);
            let kind = profile.sample_task_kind(&mut self.rng).to_string();
            let mut start_offset = TimeDelta::seconds(self.rng.gen_range(0..=offset_cap));
            // A running job's tasks have all started by the reference time.
            if let (Status::Running, Some(start)) = (status, timing.start) {
                start_offset = start_offset.min(request.reference_time - start);
            }
            tasks.push(TaskSpec {
                kind,
                request: task_request,
                start_offset,
                duration: TimeDelta::seconds(
                    ((planned.num_seconds() as f64 * scale) as i64).max(60),
                ),
                instances: subdivide(task_request, instance_count, &mut self.rng),
            });
        }

        let depends_on = if status == Status::Waiting {
            self.dependencies(id)
        } else {
            BTreeSet::new()
        };

        JobSpec {
            id,
            priority,
            job_type: profile.job_type,
            submit_time,
            status,
            start_time: timing.start,
            end_time: timing.end,
            depends_on,
            tasks,
        }
    }

    /// Other job ids from the whole population; may reference jobs not
    /// generated yet.
    fn dependencies(&mut self, id: JobId) -> BTreeSet<JobId> {
        let policy = &self.request.policy;
        let mut deps = BTreeSet::new();
        if self.request.jobs < 2
            || policy.max_dependencies == 0
            || !self.rng.gen_bool(policy.dependency_probability)
        {
            return deps;
        }

        let wanted = self.rng.gen_range(1..=policy.max_dependencies) as usize;
        let wanted = wanted.min(self.request.jobs as usize - 1);
        while deps.len() < wanted {
            let dep = JobId(self.rng.gen_range(0..self.request.jobs));
            if dep != id {
                deps.insert(dep);
            }
        }
        deps
    }

    /// Generate the population and submit it job by job.
    ///
    /// Jobs that would close a dependency cycle are logged and skipped;
    /// any other submission error aborts.
    pub fn feed(&mut self, scheduler: &mut Scheduler) -> Result<PopulationSummary> {
        let specs = self.generate();
        let mut summary = PopulationSummary {
            generated: specs.len(),
            ..PopulationSummary::default()
        };

        for spec in specs {
            match scheduler.submit(spec) {
                Ok(Admission::Queued) => summary.queued += 1,
                Ok(Admission::Adopted) => summary.adopted += 1,
                Ok(Admission::Demoted) => summary.demoted += 1,
                Ok(Admission::Historical) => summary.historical += 1,
                Err(CloudyError::CycleDetected { job, dependency }) => {
                    warn!(%job, %dependency, "dependency cycle; job not admitted");
                    summary.rejected.push(job);
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            seed = self.seed,
            generated = summary.generated,
            queued = summary.queued,
            adopted = summary.adopted,
            demoted = summary.demoted,
            historical = summary.historical,
            rejected = summary.rejected.len(),
            "population submitted"
        );
        Ok(summary)
    }
}
