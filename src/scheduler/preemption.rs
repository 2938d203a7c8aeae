// src/scheduler/preemption.rs

//! Victim selection for priority preemption.

use std::cmp::Reverse;

use crate::errors::Result;
use crate::model::{Instance, Workload};
use crate::pool::ResourcePool;
use crate::scheduler::placement;
use crate::types::{JobId, Status};

/// Running jobs with strictly lower priority than `priority`, in eviction
/// order: lowest priority first, then latest submit, then highest id.
pub fn candidates(workload: &Workload, priority: u32) -> Vec<JobId> {
    let mut victims: Vec<_> = workload
        .jobs()
        .filter(|j| j.status == Status::Running && j.priority < priority)
        .collect();
    victims.sort_by_key(|j| (j.priority, Reverse(j.submit_time), Reverse(j.id)));
    victims.into_iter().map(|j| j.id).collect()
}

/// Shortest prefix of [`candidates`] whose eviction makes `job` placeable.
///
/// Nothing is mutated; the freed resources are credited to a scratch copy of
/// the pool's headroom one victim at a time. `None` if even evicting every
/// candidate would not be enough.
pub fn select_victims(
    workload: &Workload,
    pool: &ResourcePool,
    job: JobId,
) -> Result<Option<Vec<JobId>>> {
    let priority = workload.job(job)?.priority;
    let mut headroom = pool.headrooms();
    let mut chosen = Vec::new();

    for victim in candidates(workload, priority) {
        for id in workload.instances_of(victim)? {
            let instance = workload.instance(id)?;
            if let Some(handle) = instance.handle {
                if let Some(slot) = headroom.get_mut(handle.vm.0 as usize) {
                    *slot += instance.allocated;
                }
            }
        }
        chosen.push(victim);

        let mut trial = headroom.clone();
        if placement::plan(workload, job, &mut trial, is_waiting)?.is_some() {
            return Ok(Some(chosen));
        }
    }

    Ok(None)
}

pub(crate) fn is_waiting(instance: &Instance) -> bool {
    instance.status == Status::Waiting
}
