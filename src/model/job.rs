// src/model/job.rs

use std::cmp::Reverse;
use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{JobId, JobType, Resources, Status, TaskId};

/// Top-level unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Higher values dispatch first.
    pub priority: u32,
    pub job_type: JobType,
    pub submit_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Roll-up of the task statuses; see [`crate::model::roll_up`].
    pub status: Status,
    pub tasks: Vec<TaskId>,
    pub depends_on: BTreeSet<JobId>,
    /// Set when the job was evicted by a higher-priority job and is due to
    /// return to the waiting queue on the next tick.
    pub preempted: bool,
    /// Number of times the job was preempted.
    pub preemptions: u32,
}

impl Job {
    /// Ordering key for admission: priority descending, then submit time,
    /// then id.
    pub fn admission_key(&self) -> (Reverse<u32>, DateTime<Utc>, JobId) {
        (Reverse(self.priority), self.submit_time, self.id)
    }
}

/// Everything needed to materialize one job with its tasks and instances.
///
/// Produced by the workload generator, or built by hand and handed to
/// [`crate::scheduler::Scheduler::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub id: JobId,
    pub priority: u32,
    pub job_type: JobType,
    pub submit_time: DateTime<Utc>,
    /// Status the job is created in. Anything other than waiting describes
    /// history from before the simulation window.
    pub status: Status,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub depends_on: BTreeSet<JobId>,
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub kind: String,
    pub request: Resources,
    pub start_offset: TimeDelta,
    pub duration: TimeDelta,
    /// One entry per instance: that instance's share of `request`.
    pub instances: Vec<Resources>,
}

impl JobSpec {
    /// Sum of all task requests.
    pub fn total_request(&self) -> Resources {
        self.tasks.iter().map(|t| t.request).sum()
    }

    /// Drop any pre-history and make this a plain waiting job.
    pub fn demote_to_waiting(&mut self) {
        self.status = Status::Waiting;
        self.start_time = None;
        self.end_time = None;
    }
}
