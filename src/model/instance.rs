// src/model/instance.rs

use chrono::{DateTime, TimeDelta, Utc};

use crate::model::UsagePattern;
use crate::pool::AllocationHandle;
use crate::types::{InstanceId, JobId, Resources, Status, TaskId, VmId};

/// A resource-bound execution unit under a task.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    pub task: TaskId,
    pub job: JobId,
    /// Planned share of the owning task's request.
    pub request: Resources,
    /// Resources this instance holds, or held on its last run. Zero until the
    /// instance is first bound.
    pub allocated: Resources,
    pub vm: Option<VmId>,
    /// Live reservation; `Some` exactly while the instance is running.
    pub handle: Option<AllocationHandle>,
    pub status: Status,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// When a running instance is planned to finish.
    pub due: Option<DateTime<Utc>>,
    /// Number of times the instance has been dispatched.
    pub attempts: u32,
    /// Interrupted by preemption and due back in the queue. Injected
    /// interruptions leave this unset and are final.
    pub evicted: bool,
    /// Highest usage observed on the current or last run.
    pub peak_usage: Resources,
    /// Usage the instance settled at when it stopped; `None` while it has
    /// not stopped.
    pub final_usage: Option<Resources>,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Fraction of `planned` run time elapsed at `at`, clamped to [0, 1].
    pub fn progress(&self, planned: TimeDelta, at: DateTime<Utc>) -> f64 {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        let planned = planned.num_seconds();
        if planned <= 0 {
            return 0.0;
        }
        ((at - start).num_seconds() as f64 / planned as f64).clamp(0.0, 1.0)
    }

    /// Fold the usage at `at` into the peak.
    pub(crate) fn observe_usage(
        &mut self,
        pattern: &UsagePattern,
        planned: TimeDelta,
        at: DateTime<Utc>,
    ) {
        let current = pattern.at(self.allocated, self.progress(planned, at));
        self.peak_usage = self.peak_usage.max_each(&current);
    }

    /// Record the usage of a run that stopped at `end`.
    pub(crate) fn settle_usage(
        &mut self,
        pattern: &UsagePattern,
        planned: TimeDelta,
        end: DateTime<Utc>,
    ) {
        self.observe_usage(pattern, planned, end);
        let settled = pattern.settled(self.allocated);
        self.peak_usage = self.peak_usage.max_each(&settled);
        self.final_usage = Some(settled);
    }

    /// Reset to the never-dispatched state, keeping identity and request.
    pub(crate) fn reset_to_waiting(&mut self) {
        self.status = Status::Waiting;
        self.allocated = Resources::ZERO;
        self.vm = None;
        self.handle = None;
        self.start_time = None;
        self.end_time = None;
        self.due = None;
        self.evicted = false;
        self.peak_usage = Resources::ZERO;
        self.final_usage = None;
    }
}
