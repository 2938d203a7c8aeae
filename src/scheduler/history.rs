// src/scheduler/history.rs

//! Instance status-change log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{InstanceId, JobId, Status, TaskId};

/// What moved an instance from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionCause {
    Dispatch,
    Completion,
    Preemption,
    Interruption,
    Requeue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub time: DateTime<Utc>,
    pub job: JobId,
    pub task: TaskId,
    pub instance: InstanceId,
    pub from: Status,
    pub to: Status,
    pub cause: TransitionCause,
}

/// Every transition the scheduler is allowed to make at run time.
///
/// Failed is only ever assigned at creation, so nothing leads into it here.
pub const ALLOWED_TRANSITIONS: [(Status, Status); 4] = [
    (Status::Waiting, Status::Running),
    (Status::Running, Status::Terminated),
    (Status::Running, Status::Interrupted),
    (Status::Interrupted, Status::Waiting),
];

pub fn is_allowed(from: Status, to: Status) -> bool {
    ALLOWED_TRANSITIONS.contains(&(from, to))
}
