// src/model/workload.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::{CloudyError, Result};
use crate::generator::profiles::usage_pattern;
use crate::model::{Instance, Job, JobSpec, Task, roll_up};
use crate::types::{InstanceId, JobId, Resources, Status, TaskId};

/// Arena holding every job, task and instance of one simulation.
///
/// Jobs own tasks and tasks own instances by id only; nothing points back
/// except through those ids, and nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    jobs: BTreeMap<JobId, Job>,
    tasks: Vec<Task>,
    instances: Vec<Instance>,
}

impl Workload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.contains_key(&id)
    }

    pub fn job(&self, id: JobId) -> Result<&Job> {
        self.jobs.get(&id).ok_or(CloudyError::UnknownJob(id))
    }

    pub(crate) fn job_mut(&mut self, id: JobId) -> Result<&mut Job> {
        self.jobs.get_mut(&id).ok_or(CloudyError::UnknownJob(id))
    }

    /// All jobs in ascending id order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn task(&self, id: TaskId) -> Result<&Task> {
        self.tasks
            .get(id.0)
            .ok_or_else(|| CloudyError::InvariantViolation(format!("unknown {id}")))
    }

    pub fn instance(&self, id: InstanceId) -> Result<&Instance> {
        self.instances
            .get(id.0)
            .ok_or_else(|| CloudyError::InvariantViolation(format!("unknown {id}")))
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> Result<&mut Instance> {
        self.instances
            .get_mut(id.0)
            .ok_or_else(|| CloudyError::InvariantViolation(format!("unknown {id}")))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Instances of a job, in task order then instance order.
    pub fn instances_of(&self, job: JobId) -> Result<Vec<InstanceId>> {
        let mut out = Vec::new();
        for task in &self.job(job)?.tasks {
            out.extend(self.task(*task)?.instances.iter().copied());
        }
        Ok(out)
    }

    /// Currently running instances in ascending id order.
    pub fn running_instances(&self) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|i| i.is_running())
            .map(|i| i.id)
            .collect()
    }

    /// Structural checks on a spec before anything is mutated.
    pub fn validate_spec(spec: &JobSpec) -> Result<()> {
        let invalid = |msg: String| Err(CloudyError::InvalidParameters(msg));

        if spec.tasks.is_empty() {
            return invalid(format!("{} has no tasks", spec.id));
        }
        for (idx, task) in spec.tasks.iter().enumerate() {
            if task.instances.is_empty() {
                return invalid(format!("{} task #{idx} has no instances", spec.id));
            }
            let total: Resources = task.instances.iter().sum();
            if !total.fits_within(&task.request) {
                return invalid(format!(
                    "{} task #{idx}: instance shares ({total}) exceed task request ({})",
                    spec.id, task.request
                ));
            }
            if task.start_offset < chrono::TimeDelta::zero()
                || task.duration <= chrono::TimeDelta::zero()
            {
                return invalid(format!(
                    "{} task #{idx}: offset must be non-negative and duration positive",
                    spec.id
                ));
            }
        }

        match (spec.status, spec.start_time, spec.end_time) {
            (Status::Waiting, None, None) => Ok(()),
            (Status::Waiting, _, _) => invalid(format!(
                "{} is waiting but carries start/end times",
                spec.id
            )),
            (Status::Running, Some(_), None) => Ok(()),
            (Status::Running, _, _) => invalid(format!(
                "{} is running and needs a start time and no end time",
                spec.id
            )),
            (_, Some(start), Some(end)) if end >= start => Ok(()),
            (status, _, _) => invalid(format!(
                "{} is {status} and needs start ≤ end timestamps",
                spec.id
            )),
        }
    }

    /// Materialize a validated spec into the arena.
    ///
    /// Instances inherit the job's status; any that started get their share
    /// recorded as allocated. Running instances are not bound to a VM here;
    /// the scheduler does that.
    pub(crate) fn insert(&mut self, spec: JobSpec) -> Result<JobId> {
        Self::validate_spec(&spec)?;
        if self.jobs.contains_key(&spec.id) {
            return Err(CloudyError::DuplicateJob(spec.id));
        }

        let job_id = spec.id;
        let mut task_ids = Vec::with_capacity(spec.tasks.len());

        for task_spec in spec.tasks {
            let task_id = TaskId(self.tasks.len());
            let start = spec.start_time.map(|s| {
                let shifted = s + task_spec.start_offset;
                match spec.end_time {
                    Some(end) => shifted.min(end),
                    None => shifted,
                }
            });
            let due = match spec.status {
                Status::Running => start.map(|s| s + task_spec.duration),
                _ => None,
            };
            let started = spec.status != Status::Waiting;
            let usage = usage_pattern(spec.job_type, &task_spec.kind);

            let mut instance_ids = Vec::with_capacity(task_spec.instances.len());
            for share in task_spec.instances {
                let instance_id = InstanceId(self.instances.len());
                let mut instance = Instance {
                    id: instance_id,
                    task: task_id,
                    job: job_id,
                    request: share,
                    allocated: if started { share } else { Resources::ZERO },
                    vm: None,
                    handle: None,
                    status: spec.status,
                    start_time: start,
                    end_time: spec.end_time,
                    due,
                    attempts: u32::from(started),
                    evicted: false,
                    peak_usage: Resources::ZERO,
                    final_usage: None,
                };
                if let Some(end) = spec.end_time {
                    instance.settle_usage(&usage, task_spec.duration, end);
                }
                self.instances.push(instance);
                instance_ids.push(instance_id);
            }

            self.tasks.push(Task {
                id: task_id,
                job: job_id,
                kind: task_spec.kind,
                request: task_spec.request,
                start_offset: task_spec.start_offset,
                duration: task_spec.duration,
                status: spec.status,
                instances: instance_ids,
                usage,
            });
            task_ids.push(task_id);
        }

        self.jobs.insert(
            job_id,
            Job {
                id: job_id,
                priority: spec.priority,
                job_type: spec.job_type,
                submit_time: spec.submit_time,
                start_time: spec.start_time,
                end_time: spec.end_time,
                status: spec.status,
                tasks: task_ids,
                depends_on: spec.depends_on,
                preempted: false,
                preemptions: 0,
            },
        );

        Ok(job_id)
    }

    /// Recompute task statuses from their instances and the job status from
    /// its tasks. A job that turns terminal gets the latest instance end time.
    pub fn roll_up(&mut self, job_id: JobId) -> Result<Status> {
        let task_ids = self.job(job_id)?.tasks.clone();
        let mut task_statuses = Vec::with_capacity(task_ids.len());
        let mut latest_end = None;

        for task_id in task_ids {
            let instance_ids = self.task(task_id)?.instances.clone();
            let mut statuses = Vec::with_capacity(instance_ids.len());
            for instance_id in instance_ids {
                let instance = self.instance(instance_id)?;
                statuses.push(instance.status);
                latest_end = latest_end.max(instance.end_time);
            }
            let status = roll_up(statuses);
            self.tasks[task_id.0].status = status;
            task_statuses.push(status);
        }

        let status = roll_up(task_statuses);
        let job = self.job_mut(job_id)?;
        job.status = status;
        if status.is_terminal() {
            job.end_time = latest_end.or(job.end_time);
        } else {
            job.end_time = None;
        }

        Ok(status)
    }

    /// Fold an instance's usage at `at` into its peak.
    pub(crate) fn observe_usage(&mut self, id: InstanceId, at: DateTime<Utc>) -> Result<()> {
        let task = self.task(self.instance(id)?.task)?;
        let (pattern, planned) = (task.usage, task.duration);
        self.instance_mut(id)?.observe_usage(&pattern, planned, at);
        Ok(())
    }

    /// Record the usage of an instance that stopped at `end`.
    pub(crate) fn settle_usage(&mut self, id: InstanceId, end: DateTime<Utc>) -> Result<()> {
        let task = self.task(self.instance(id)?.task)?;
        let (pattern, planned) = (task.usage, task.duration);
        self.instance_mut(id)?.settle_usage(&pattern, planned, end);
        Ok(())
    }

    /// Sum of instance allocations under a task.
    pub fn task_allocation(&self, task: TaskId) -> Result<Resources> {
        let mut total = Resources::ZERO;
        for id in &self.task(task)?.instances {
            total += self.instance(*id)?.allocated;
        }
        Ok(total)
    }

    /// Check that no task's instances hold more than the task requested.
    pub fn check_task_allocations(&self) -> Result<()> {
        for task in &self.tasks {
            let allocated = self.task_allocation(task.id)?;
            if !allocated.fits_within(&task.request) {
                return Err(CloudyError::InvariantViolation(format!(
                    "{} instances hold {allocated}, more than requested {}",
                    task.id, task.request
                )));
            }
        }
        Ok(())
    }

    /// Number of jobs per status.
    pub fn status_summary(&self) -> BTreeMap<Status, usize> {
        let mut counts: BTreeMap<Status, usize> =
            Status::ALL.iter().map(|s| (*s, 0)).collect();
        for job in self.jobs.values() {
            *counts.entry(job.status).or_default() += 1;
        }
        counts
    }
}
