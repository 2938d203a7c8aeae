// src/model/mod.rs

//! Entity model: jobs own tasks, tasks own instances.
//!
//! - [`workload`] is the arena that stores all entities of one simulation.
//! - [`roll_up`] derives a parent's status from its children.
//! - [`usage`] models how much of an allocation an instance really uses.

pub mod instance;
pub mod job;
pub mod task;
pub mod usage;
pub mod workload;

pub use instance::Instance;
pub use job::{Job, JobSpec, TaskSpec};
pub use task::Task;
pub use usage::UsagePattern;
pub use workload::Workload;

use crate::types::Status;

/// Derive a parent status from child statuses.
///
/// Any failed child fails the parent; all terminated means terminated; any
/// running child keeps the parent running; otherwise any interrupted child
/// makes it interrupted. Everything else (including no children) is waiting.
pub fn roll_up(statuses: impl IntoIterator<Item = Status>) -> Status {
    let mut seen = 0usize;
    let mut terminated = 0usize;
    let mut any_failed = false;
    let mut any_running = false;
    let mut any_interrupted = false;

    for status in statuses {
        seen += 1;
        match status {
            Status::Failed => any_failed = true,
            Status::Terminated => terminated += 1,
            Status::Running => any_running = true,
            Status::Interrupted => any_interrupted = true,
            Status::Waiting => {}
        }
    }

    if any_failed {
        Status::Failed
    } else if seen > 0 && terminated == seen {
        Status::Terminated
    } else if any_running {
        Status::Running
    } else if any_interrupted {
        Status::Interrupted
    } else {
        Status::Waiting
    }
}
