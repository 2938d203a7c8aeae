// src/scheduler/mod.rs

//! Priority admission, dispatch and preemption.
//!
//! - [`placement`] decides which VM each task goes to.
//! - [`preemption`] picks lower-priority victims when a job does not fit.
//! - [`step`] is the per-tick state machine.
//! - [`history`] records every instance status change.

pub mod history;
pub mod placement;
pub mod preemption;
pub mod step;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dag::DependencyGraph;
use crate::errors::{CloudyError, Result};
use crate::model::{Instance, JobSpec, Workload};
use crate::pool::{AllocationHandle, ResourcePool};
use crate::types::{InstanceId, JobId, Status, VmId};

pub use history::{StatusChange, TransitionCause};
pub use placement::Placement;
pub use step::TickOutcome;

/// How a submitted job entered the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Waiting for dispatch.
    Queued,
    /// Created running and bound to VMs.
    Adopted,
    /// Created running but could not be bound; now waiting.
    Demoted,
    /// Created in a terminal state; kept for reporting only.
    Historical,
}

/// Owns one simulation's entities, dependency graph and resource pool.
///
/// All status changes happen through this type.
#[derive(Debug, Clone)]
pub struct Scheduler {
    workload: Workload,
    graph: DependencyGraph,
    pool: ResourcePool,
    history: Vec<StatusChange>,
}

impl Scheduler {
    pub fn new(pool: ResourcePool) -> Self {
        Self {
            workload: Workload::new(),
            graph: DependencyGraph::new(),
            pool,
            history: Vec::new(),
        }
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Number of jobs in each status right now.
    pub fn status_summary(&self) -> BTreeMap<Status, usize> {
        self.workload.status_summary()
    }

    pub fn status_of(&self, job: JobId) -> Option<Status> {
        self.workload.job(job).ok().map(|j| j.status)
    }

    pub fn is_ready(&self, job: JobId) -> bool {
        self.graph
            .is_ready(job, |dep| self.workload.job(dep).ok().map(|j| j.status))
    }

    /// Admit a job into the workload.
    ///
    /// The dependency graph is updated first; a job that would close a cycle
    /// fails with [`CloudyError::CycleDetected`] and leaves no trace. A job
    /// created running is bound to VMs through the normal placement path, or
    /// demoted to waiting if a dependency is unfinished or there is no room.
    pub fn submit(&mut self, spec: JobSpec) -> Result<Admission> {
        if self.workload.contains(spec.id) {
            return Err(CloudyError::DuplicateJob(spec.id));
        }
        Workload::validate_spec(&spec)?;
        self.graph.add_job(spec.id, &spec.depends_on)?;

        let id = spec.id;
        let status = spec.status;
        self.workload.insert(spec)?;

        match status {
            Status::Waiting => Ok(Admission::Queued),
            Status::Running => self.adopt(id),
            _ => Ok(Admission::Historical),
        }
    }

    fn adopt(&mut self, id: JobId) -> Result<Admission> {
        let plan = if self.is_ready(id) {
            let mut headroom = self.pool.headrooms();
            placement::plan(&self.workload, id, &mut headroom, Instance::is_running)?
        } else {
            None
        };

        let Some(plan) = plan else {
            warn!(job = %id, "running job cannot be bound; demoting to waiting");
            for instance in self.workload.instances_of(id)? {
                self.workload.instance_mut(instance)?.reset_to_waiting();
            }
            self.workload.job_mut(id)?.start_time = None;
            self.workload.roll_up(id)?;
            return Ok(Admission::Demoted);
        };

        for placement in plan {
            for instance in placement.instances {
                let handle = self.reserve_planned(instance, placement.vm)?;
                let inst = self.workload.instance_mut(instance)?;
                inst.handle = Some(handle);
                inst.vm = Some(placement.vm);
            }
        }
        debug!(job = %id, "running job bound to VMs");
        Ok(Admission::Adopted)
    }

    /// Reserve an instance's request on the VM a plan chose for it.
    ///
    /// Plans are made against current headroom, so a miss here means the
    /// bookkeeping is broken.
    fn reserve_planned(&mut self, instance: InstanceId, vm: VmId) -> Result<AllocationHandle> {
        let request = self.workload.instance(instance)?.request;
        self.pool.reserve(vm, request).map_err(|err| match err {
            CloudyError::InsufficientResources(msg) => CloudyError::InvariantViolation(format!(
                "planned placement of {instance} no longer fits: {msg}"
            )),
            other => other,
        })
    }

    /// Bind a job's waiting instances according to `plan` and start it.
    fn dispatch(&mut self, job: JobId, plan: Vec<Placement>, now: DateTime<Utc>) -> Result<()> {
        for placement in plan {
            let task = self.workload.task(placement.task)?;
            let start = now + task.start_offset;
            let due = start + task.duration;

            for instance in placement.instances {
                let handle = self.reserve_planned(instance, placement.vm)?;
                let inst = self.workload.instance_mut(instance)?;
                let from = inst.status;
                inst.status = Status::Running;
                inst.allocated = inst.request;
                inst.vm = Some(placement.vm);
                inst.handle = Some(handle);
                inst.start_time = Some(start);
                inst.end_time = None;
                inst.due = Some(due);
                inst.attempts += 1;
                self.workload.observe_usage(instance, start)?;
                self.record(now, instance, from, Status::Running, TransitionCause::Dispatch)?;
            }
        }

        self.workload.job_mut(job)?.start_time = Some(now);
        self.workload.roll_up(job)?;
        Ok(())
    }

    /// The single path that takes a running instance off its VM as
    /// interrupted. Used by both preemption and failure injection.
    pub(crate) fn release_and_mark_interrupted(
        &mut self,
        instance: InstanceId,
        now: DateTime<Utc>,
        cause: TransitionCause,
    ) -> Result<()> {
        self.finish_instance(instance, Status::Interrupted, now, cause)
    }

    fn finish_instance(
        &mut self,
        instance: InstanceId,
        to: Status,
        end: DateTime<Utc>,
        cause: TransitionCause,
    ) -> Result<()> {
        let inst = self.workload.instance(instance)?;
        if inst.status != Status::Running {
            return Err(CloudyError::InvariantViolation(format!(
                "{instance} is {} and cannot become {to}",
                inst.status
            )));
        }
        let handle = inst.handle.ok_or_else(|| {
            CloudyError::InvariantViolation(format!("running {instance} holds no reservation"))
        })?;
        self.pool.release(handle)?;

        let inst = self.workload.instance_mut(instance)?;
        inst.handle = None;
        inst.status = to;
        inst.end_time = Some(end);
        inst.due = None;
        self.workload.settle_usage(instance, end)?;
        self.record(end, instance, Status::Running, to, cause)
    }

    /// Evict every running instance of `job` and flag it for requeue.
    fn preempt(&mut self, job: JobId, now: DateTime<Utc>) -> Result<()> {
        for instance in self.workload.instances_of(job)? {
            if self.workload.instance(instance)?.is_running() {
                self.release_and_mark_interrupted(instance, now, TransitionCause::Preemption)?;
                self.workload.instance_mut(instance)?.evicted = true;
            }
        }
        let entry = self.workload.job_mut(job)?;
        entry.preempted = true;
        entry.preemptions += 1;
        self.workload.roll_up(job)?;
        Ok(())
    }

    /// Put a preempted job back in the queue with its original submit time.
    ///
    /// Only evicted instances are reset. A job that already lost an instance
    /// to an injected interruption cannot finish, so it stays interrupted and
    /// `false` is returned.
    fn requeue(&mut self, job: JobId, now: DateTime<Utc>) -> Result<bool> {
        let instances = self.workload.instances_of(job)?;

        let mut lost = false;
        for instance in &instances {
            let inst = self.workload.instance(*instance)?;
            lost |= inst.status == Status::Interrupted && !inst.evicted;
        }

        for instance in instances {
            if !self.workload.instance(instance)?.evicted {
                continue;
            }
            if lost {
                self.workload.instance_mut(instance)?.evicted = false;
                continue;
            }
            self.workload.instance_mut(instance)?.reset_to_waiting();
            self.record(
                now,
                instance,
                Status::Interrupted,
                Status::Waiting,
                TransitionCause::Requeue,
            )?;
        }

        let entry = self.workload.job_mut(job)?;
        entry.preempted = false;
        if !lost {
            entry.start_time = None;
        }
        let status = self.workload.roll_up(job)?;
        if lost {
            info!(job = %job, %status, "preempted job has injected interruptions; not requeued");
        }
        Ok(!lost)
    }

    fn record(
        &mut self,
        time: DateTime<Utc>,
        instance: InstanceId,
        from: Status,
        to: Status,
        cause: TransitionCause,
    ) -> Result<()> {
        let inst = self.workload.instance(instance)?;
        self.history.push(StatusChange {
            time,
            job: inst.job,
            task: inst.task,
            instance,
            from,
            to,
            cause,
        });
        Ok(())
    }

    /// Cross-check pool, workload and graph.
    ///
    /// - every VM within capacity and matching its live reservations
    /// - per task, instance allocations within the task request
    /// - every running instance holds exactly its allocation
    /// - every running job has all dependencies terminated
    pub fn check_invariants(&self) -> Result<()> {
        self.pool.check_invariants()?;
        self.workload.check_task_allocations()?;

        for inst in self.workload.instances() {
            if !inst.is_running() {
                continue;
            }
            let held = inst.handle.and_then(|h| self.pool.allocation(h));
            if held != Some(inst.allocated) {
                return Err(CloudyError::InvariantViolation(format!(
                    "running {} allocated {} but pool holds {:?}",
                    inst.id, inst.allocated, held
                )));
            }
        }

        for job in self.workload.jobs() {
            if job.status == Status::Running && !self.is_ready(job.id) {
                return Err(CloudyError::InvariantViolation(format!(
                    "{} is running with unfinished dependencies",
                    job.id
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn log_admission(&self, job: JobId, now: DateTime<Utc>, evicted: &[JobId]) {
        if evicted.is_empty() {
            info!(job = %job, %now, "job admitted");
        } else {
            info!(job = %job, %now, victims = ?evicted, "job admitted after preemption");
        }
    }
}
