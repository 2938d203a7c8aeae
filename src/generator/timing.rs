// src/generator/timing.rs

//! Status-driven start/end times for generated jobs.
//!
//! Each status maps to one rule in [`TIMING_POLICIES`]. All rules keep
//! `submit ≤ start ≤ end ≤ now`.

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use rand::rngs::StdRng;

use crate::types::Status;

#[derive(Debug, Clone, Copy)]
pub struct TimingInput {
    /// Reference time the workload is generated at.
    pub now: DateTime<Utc>,
    pub submit_time: DateTime<Utc>,
    /// Planned run time of the job.
    pub planned: TimeDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTiming {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

pub type TimingRule = fn(&TimingInput, &mut StdRng) -> JobTiming;

pub const TIMING_POLICIES: [(Status, TimingRule); 5] = [
    (Status::Waiting, waiting),
    (Status::Running, running),
    (Status::Terminated, terminated),
    (Status::Failed, failed),
    (Status::Interrupted, interrupted),
];

/// Apply the rule registered for `status`.
pub fn timing_for(status: Status, input: &TimingInput, rng: &mut StdRng) -> JobTiming {
    let rule = TIMING_POLICIES
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, rule)| *rule)
        .unwrap_or(waiting);
    rule(input, rng)
}

/// Uniform duration in `[0, max]`, second resolution.
fn uniform_up_to(rng: &mut StdRng, max: TimeDelta) -> TimeDelta {
    let secs = max.num_seconds().max(0);
    TimeDelta::seconds(rng.gen_range(0..=secs))
}

fn elapsed(input: &TimingInput) -> TimeDelta {
    (input.now - input.submit_time).max(TimeDelta::zero())
}

/// No start, no end.
fn waiting(_input: &TimingInput, _rng: &mut StdRng) -> JobTiming {
    JobTiming {
        start: None,
        end: None,
    }
}

/// Full planned duration, shortened only if the job was submitted too
/// recently to have finished one.
fn terminated(input: &TimingInput, rng: &mut StdRng) -> JobTiming {
    let elapsed = elapsed(input);
    let run = input.planned.min(elapsed);
    let start = input.submit_time + uniform_up_to(rng, elapsed - run);
    JobTiming {
        start: Some(start),
        end: Some(start + run),
    }
}

/// Ends after at most half the planned duration.
fn failed(input: &TimingInput, rng: &mut StdRng) -> JobTiming {
    let start = input.submit_time + uniform_up_to(rng, elapsed(input));
    let budget = (input.planned / 2).min(input.now - start);
    JobTiming {
        start: Some(start),
        end: Some(start + uniform_up_to(rng, budget)),
    }
}

/// Started some fraction of the planned duration ago; open end.
fn running(input: &TimingInput, rng: &mut StdRng) -> JobTiming {
    let progress = rng.gen_range(0.05..0.95);
    let back = TimeDelta::seconds((input.planned.num_seconds() as f64 * progress) as i64);
    JobTiming {
        start: Some(input.now - back.min(elapsed(input))),
        end: None,
    }
}

/// Random partial duration up to the planned one.
fn interrupted(input: &TimingInput, rng: &mut StdRng) -> JobTiming {
    let start = input.submit_time + uniform_up_to(rng, elapsed(input));
    let budget = input.planned.min(input.now - start);
    JobTiming {
        start: Some(start),
        end: Some(start + uniform_up_to(rng, budget)),
    }
}
