// src/report/verify.rs

//! After-the-fact checks of a finished run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::Result;
use crate::model::Workload;
use crate::scheduler::{StatusChange, TransitionCause};
use crate::scheduler::history::is_allowed;
use crate::types::{InstanceId, JobId, Status};

/// A job that started before one of its dependencies terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyViolation {
    pub job: JobId,
    pub dependency: JobId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub dependency_violations: Vec<DependencyViolation>,
    /// Changes outside the allowed-transition table, whose `from` does not
    /// match the instance's previous recorded status, or requeues of an
    /// instance that was not preempted.
    pub invalid_transitions: Vec<StatusChange>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.dependency_violations.is_empty() && self.invalid_transitions.is_empty()
    }
}

/// Check dependency ordering over the workload and every recorded transition.
pub fn verify_workload_execution(
    workload: &Workload,
    history: &[StatusChange],
) -> Result<VerificationReport> {
    let mut report = VerificationReport::default();

    for job in workload.jobs() {
        let Some(started) = job.start_time else {
            continue;
        };
        for dep in &job.depends_on {
            let satisfied = workload.job(*dep).ok().is_some_and(|d| {
                d.status == Status::Terminated && d.end_time.is_some_and(|end| end <= started)
            });
            if !satisfied {
                report.dependency_violations.push(DependencyViolation {
                    job: job.id,
                    dependency: *dep,
                });
            }
        }
    }

    let mut last: BTreeMap<InstanceId, (Status, TransitionCause)> = BTreeMap::new();
    for change in history {
        let previous = last.get(&change.instance);
        let continues = previous.is_none_or(|(status, _)| *status == change.from);
        let requeue_ok = change.cause != TransitionCause::Requeue
            || previous.is_some_and(|(_, cause)| *cause == TransitionCause::Preemption);
        if !is_allowed(change.from, change.to) || !continues || !requeue_ok {
            report.invalid_transitions.push(change.clone());
        }
        last.insert(change.instance, (change.to, change.cause));
    }

    Ok(report)
}
