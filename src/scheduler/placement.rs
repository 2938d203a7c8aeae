// src/scheduler/placement.rs

//! First-fit placement of a job's tasks onto VMs.

use crate::errors::Result;
use crate::model::{Instance, Workload};
use crate::types::{InstanceId, JobId, Resources, TaskId, VmId};

/// One task's instances bound to one VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub task: TaskId,
    pub vm: VmId,
    pub instances: Vec<InstanceId>,
    pub demand: Resources,
}

/// First VM (ascending id) whose headroom covers `demand`.
pub fn first_fit(headroom: &[Resources], demand: &Resources) -> Option<usize> {
    headroom.iter().position(|free| demand.fits_within(free))
}

/// Plan where each task of `job` goes.
///
/// Only instances accepted by `wants` are placed; a task's aggregate demand
/// is the sum of those instances and must fit on a single VM. `headroom` is a
/// scratch copy that is debited as tasks are placed. Returns `None` if some
/// task fits nowhere.
pub fn plan(
    workload: &Workload,
    job: JobId,
    headroom: &mut [Resources],
    wants: impl Fn(&Instance) -> bool,
) -> Result<Option<Vec<Placement>>> {
    let mut placements = Vec::new();

    for task_id in &workload.job(job)?.tasks {
        let task = workload.task(*task_id)?;
        let mut instances = Vec::with_capacity(task.instances.len());
        let mut demand = Resources::ZERO;
        for id in &task.instances {
            let instance = workload.instance(*id)?;
            if wants(instance) {
                instances.push(instance.id);
                demand += instance.request;
            }
        }
        if instances.is_empty() {
            continue;
        }

        let Some(idx) = first_fit(headroom, &demand) else {
            return Ok(None);
        };
        headroom[idx] = headroom[idx].saturating_sub(&demand);
        placements.push(Placement {
            task: task.id,
            vm: VmId(idx as u32),
            instances,
            demand,
        });
    }

    Ok(Some(placements))
}
