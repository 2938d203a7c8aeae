// src/scheduler/step.rs

//! One scheduling tick.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{CloudyError, Result};
use crate::injector::InterruptionSource;
use crate::scheduler::preemption::{self, is_waiting};
use crate::scheduler::{Scheduler, TransitionCause, placement};
use crate::types::{InstanceId, JobId, Status};

/// Structured result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub time: DateTime<Utc>,
    /// Jobs preempted on the previous tick that went back to waiting.
    pub requeued: Vec<JobId>,
    /// Instances interrupted by the interruption source.
    pub interrupted: Vec<InstanceId>,
    /// Instances that reached their planned end.
    pub completed: Vec<InstanceId>,
    pub admitted: Vec<JobId>,
    /// Victims evicted to make room for higher-priority jobs.
    pub preempted: Vec<JobId>,
    /// Ready jobs that did not fit and stay waiting.
    pub deferred: Vec<JobId>,
    /// Jobs held back by unfinished dependencies.
    pub blocked: Vec<JobId>,
}

impl TickOutcome {
    fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            requeued: Vec::new(),
            interrupted: Vec::new(),
            completed: Vec::new(),
            admitted: Vec::new(),
            preempted: Vec::new(),
            deferred: Vec::new(),
            blocked: Vec::new(),
        }
    }
}

impl Scheduler {
    /// Advance the simulation to `now`.
    ///
    /// Order within a tick:
    /// 1. jobs preempted on the previous tick return to waiting
    /// 2. the interruption source picks running instances to interrupt
    /// 3. running instances past their planned end terminate
    /// 4. usage of the instances still running is sampled
    /// 5. waiting, submitted jobs are evaluated once in priority order
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        interruptions: &mut impl InterruptionSource,
    ) -> Result<TickOutcome> {
        let mut outcome = TickOutcome::new(now);

        let preempted: Vec<JobId> = self
            .workload
            .jobs()
            .filter(|j| j.preempted)
            .map(|j| j.id)
            .collect();
        for job in preempted {
            if self.requeue(job, now)? {
                outcome.requeued.push(job);
            }
        }

        let running = self.workload.running_instances();
        let mut touched = BTreeSet::new();
        for instance in interruptions.select(&running) {
            self.release_and_mark_interrupted(instance, now, TransitionCause::Interruption)?;
            touched.insert(self.workload.instance(instance)?.job);
            outcome.interrupted.push(instance);
        }

        for instance in self.workload.running_instances() {
            let inst = self.workload.instance(instance)?;
            let Some(due) = inst.due.filter(|due| *due <= now) else {
                continue;
            };
            touched.insert(inst.job);
            self.finish_instance(instance, Status::Terminated, due, TransitionCause::Completion)?;
            outcome.completed.push(instance);
        }

        for job in touched {
            self.workload.roll_up(job)?;
        }

        for instance in self.workload.running_instances() {
            self.workload.observe_usage(instance, now)?;
        }

        self.admit(now, &mut outcome)?;

        debug!(
            %now,
            admitted = outcome.admitted.len(),
            completed = outcome.completed.len(),
            interrupted = outcome.interrupted.len(),
            preempted = outcome.preempted.len(),
            deferred = outcome.deferred.len(),
            blocked = outcome.blocked.len(),
            "tick complete"
        );
        Ok(outcome)
    }

    fn admit(&mut self, now: DateTime<Utc>, outcome: &mut TickOutcome) -> Result<()> {
        let mut contenders: Vec<_> = self
            .workload
            .jobs()
            .filter(|j| j.status == Status::Waiting && j.submit_time <= now)
            .collect();
        contenders.sort_by_key(|j| j.admission_key());
        let contenders: Vec<JobId> = contenders.into_iter().map(|j| j.id).collect();

        for job in contenders {
            if !self.is_ready(job) {
                debug!(job = %job, "blocked on dependencies");
                outcome.blocked.push(job);
                continue;
            }

            let mut headroom = self.pool.headrooms();
            if let Some(plan) = placement::plan(&self.workload, job, &mut headroom, is_waiting)? {
                self.dispatch(job, plan, now)?;
                self.log_admission(job, now, &[]);
                outcome.admitted.push(job);
                continue;
            }

            let Some(victims) = preemption::select_victims(&self.workload, &self.pool, job)?
            else {
                debug!(job = %job, "insufficient resources; deferred");
                outcome.deferred.push(job);
                continue;
            };

            for victim in &victims {
                self.preempt(*victim, now)?;
            }
            let mut headroom = self.pool.headrooms();
            let plan = placement::plan(&self.workload, job, &mut headroom, is_waiting)?
                .ok_or_else(|| {
                    CloudyError::InvariantViolation(format!(
                        "{job} still does not fit after preempting {victims:?}"
                    ))
                })?;
            self.dispatch(job, plan, now)?;
            self.log_admission(job, now, &victims);
            outcome.preempted.extend(victims);
            outcome.admitted.push(job);
        }

        Ok(())
    }
}
