// src/report/records.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::model::Workload;
use crate::types::{InstanceId, JobId, JobType, Resources, Status, TaskId, VmId};

/// One row of the flat output: an instance with its job's attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub instance_id: InstanceId,
    pub job_type: JobType,
    pub priority: u32,
    pub submit_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Status,
    pub cpu_millis: u64,
    pub memory_mb: u64,
    pub gpu_millis: u64,
    pub disk_gb: u64,
    pub vm_id: Option<VmId>,
    /// Highest usage seen on the instance's current or last run.
    pub peak_usage: Resources,
    /// Usage it settled at when it stopped.
    pub final_usage: Option<Resources>,
}

impl InstanceRecord {
    pub fn allocated(&self) -> Resources {
        Resources::new(self.cpu_millis, self.memory_mb, self.gpu_millis, self.disk_gb)
    }

    /// Usage attributed to the instance over its whole run: the settled
    /// usage once stopped, otherwise the latest peak.
    pub fn used(&self) -> Resources {
        self.final_usage.unwrap_or(self.peak_usage)
    }
}

/// Flatten the workload, ordered by job id, then task, then instance.
pub fn instance_records(workload: &Workload) -> Result<Vec<InstanceRecord>> {
    let mut records = Vec::with_capacity(workload.instances().len());

    for job in workload.jobs() {
        for task_id in &job.tasks {
            for instance_id in &workload.task(*task_id)?.instances {
                let instance = workload.instance(*instance_id)?;
                records.push(InstanceRecord {
                    job_id: job.id,
                    task_id: *task_id,
                    instance_id: instance.id,
                    job_type: job.job_type,
                    priority: job.priority,
                    submit_time: job.submit_time,
                    start_time: instance.start_time,
                    end_time: instance.end_time,
                    status: instance.status,
                    cpu_millis: instance.allocated.cpu_millis,
                    memory_mb: instance.allocated.memory_mb,
                    gpu_millis: instance.allocated.gpu_millis,
                    disk_gb: instance.allocated.disk_gb,
                    vm_id: instance.vm,
                    peak_usage: instance.peak_usage,
                    final_usage: instance.final_usage,
                });
            }
        }
    }

    Ok(records)
}
