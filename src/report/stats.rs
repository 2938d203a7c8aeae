// src/report/stats.rs

//! Aggregate statistics, computed purely from instance records.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::report::records::InstanceRecord;
use crate::types::{JobId, JobType, Resources, Status};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub time: DateTime<Utc>,
    pub active_jobs: usize,
    /// Resources allocated to active instances.
    pub usage: Resources,
    /// Resources those instances actually use; see [`InstanceRecord::used`].
    pub used: Resources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_jobs: usize,
    pub total_instances: usize,
    /// Sum of every instance's allocation (held now or on its last run).
    pub total_allocated: Resources,
    /// Sum of every instance's peak usage.
    pub total_peak_usage: Resources,
    /// Jobs per type.
    pub job_types: BTreeMap<JobType, usize>,
    /// Instances per status.
    pub instance_statuses: BTreeMap<Status, usize>,
    /// One point per tick from the earliest start to the latest end.
    pub timeline: Vec<TimelinePoint>,
}

impl Statistics {
    /// Reduce records into statistics.
    ///
    /// Instances without an end time count as active until `open_until`.
    /// `tick` sets the timeline resolution and must be positive.
    pub fn from_records(
        records: &[InstanceRecord],
        tick: TimeDelta,
        open_until: DateTime<Utc>,
    ) -> Self {
        let mut jobs: BTreeMap<JobId, JobType> = BTreeMap::new();
        let mut instance_statuses: BTreeMap<Status, usize> =
            Status::ALL.iter().map(|s| (*s, 0)).collect();
        let mut total_allocated = Resources::ZERO;
        let mut total_peak_usage = Resources::ZERO;

        for record in records {
            jobs.insert(record.job_id, record.job_type);
            *instance_statuses.entry(record.status).or_default() += 1;
            total_allocated += record.allocated();
            total_peak_usage += record.peak_usage;
        }

        let mut job_types: BTreeMap<JobType, usize> =
            JobType::ALL.iter().map(|t| (*t, 0)).collect();
        for job_type in jobs.values() {
            *job_types.entry(*job_type).or_default() += 1;
        }

        Self {
            total_jobs: jobs.len(),
            total_instances: records.len(),
            total_allocated,
            total_peak_usage,
            job_types,
            instance_statuses,
            timeline: timeline(records, tick, open_until),
        }
    }
}

/// Bucketed active-job counts and resource usage.
///
/// Built with difference arrays: each interval adds at its first bucket and
/// subtracts one past its last, then a prefix sum yields the series.
fn timeline(
    records: &[InstanceRecord],
    tick: TimeDelta,
    open_until: DateTime<Utc>,
) -> Vec<TimelinePoint> {
    let tick_secs = tick.num_seconds();
    if tick_secs <= 0 {
        return Vec::new();
    }

    let intervals: Vec<(&InstanceRecord, DateTime<Utc>, DateTime<Utc>)> = records
        .iter()
        .filter_map(|r| {
            let start = r.start_time?;
            let end = r.end_time.unwrap_or(open_until).max(start);
            Some((r, start, end))
        })
        .collect();

    let Some(origin) = intervals.iter().map(|(_, s, _)| *s).min() else {
        return Vec::new();
    };
    let last = intervals
        .iter()
        .map(|(_, _, e)| *e)
        .max()
        .unwrap_or(origin);

    let bucket = |t: DateTime<Utc>| ((t - origin).num_seconds() / tick_secs) as usize;
    let buckets = bucket(last) + 1;

    // Allocated dimensions, then used dimensions.
    let mut usage_diff = vec![[0i128; 8]; buckets + 1];
    let mut job_spans: BTreeMap<JobId, (usize, usize)> = BTreeMap::new();

    for (record, start, end) in &intervals {
        let (first, past) = (bucket(*start), bucket(*end) + 1);
        let amounts = record
            .allocated()
            .dimensions()
            .into_iter()
            .chain(record.used().dimensions());
        for (d, amount) in amounts.enumerate() {
            usage_diff[first][d] += i128::from(amount);
            usage_diff[past][d] -= i128::from(amount);
        }
        job_spans
            .entry(record.job_id)
            .and_modify(|(a, b)| {
                *a = (*a).min(first);
                *b = (*b).max(past);
            })
            .or_insert((first, past));
    }

    let mut job_diff = vec![0i64; buckets + 1];
    for (first, past) in job_spans.values() {
        job_diff[*first] += 1;
        job_diff[*past] -= 1;
    }

    let mut points = Vec::with_capacity(buckets);
    let mut running = [0i128; 8];
    let mut active = 0i64;
    let to_resources = |dims: &[i128]| {
        let mut out = [0u64; 4];
        for (slot, v) in out.iter_mut().zip(dims) {
            *slot = (*v).max(0) as u64;
        }
        Resources::from_dimensions(out)
    };
    for idx in 0..buckets {
        for d in 0..8 {
            running[d] += usage_diff[idx][d];
        }
        active += job_diff[idx];
        points.push(TimelinePoint {
            time: origin + TimeDelta::seconds(idx as i64 * tick_secs),
            active_jobs: active.max(0) as usize,
            usage: to_resources(&running[..4]),
            used: to_resources(&running[4..]),
        });
    }
    points
}
