// src/model/task.rs

use chrono::TimeDelta;

use crate::model::UsagePattern;
use crate::types::{InstanceId, JobId, Resources, Status, TaskId};

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub job: JobId,
    /// Free-form label such as `"training"` or `"frontend"`.
    pub kind: String,
    pub request: Resources,
    /// Offset of this task's start from its job's start.
    pub start_offset: TimeDelta,
    /// Planned run time of each instance once dispatched.
    pub duration: TimeDelta,
    pub status: Status,
    pub instances: Vec<InstanceId>,
    /// Looked up from the job type's profile by `kind`.
    pub usage: UsagePattern,
}
