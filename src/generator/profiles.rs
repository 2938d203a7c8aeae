// src/generator/profiles.rs

//! Per-job-type characteristics used when sampling a synthetic workload.

use rand::Rng;
use rand::rngs::StdRng;

use crate::model::UsagePattern;
use crate::types::{JobType, Resources};

/// Inclusive ranges a job of one type is sampled from.
///
/// Resource ranges describe the job's aggregate request, before it is
/// divided among tasks and instances.
#[derive(Debug, Clone, Copy)]
pub struct JobProfile {
    pub job_type: JobType,
    /// Relative frequency, in percent.
    pub weight: u32,
    pub duration_minutes: (i64, i64),
    pub cpu_cores: (u64, u64),
    pub memory_gb: (u64, u64),
    pub gpus: (u64, u64),
    pub disk_gb: (u64, u64),
    pub task_kinds: [&'static str; 3],
    /// Usage pattern of each entry in `task_kinds`.
    pub usage: [UsagePattern; 3],
}

const fn pattern(
    cpu: (f64, f64),
    memory: (f64, f64),
    gpu: (f64, f64),
    disk: (f64, f64),
) -> UsagePattern {
    UsagePattern {
        cpu,
        memory,
        gpu,
        disk,
    }
}

const INGESTION: UsagePattern = pattern((0.4, 0.8), (0.3, 0.6), (0.0, 0.0), (0.7, 0.9));
const PROCESSING: UsagePattern = pattern((0.6, 0.9), (0.5, 0.8), (0.0, 0.0), (0.4, 0.7));
const TRAINING: UsagePattern = pattern((0.7, 1.0), (0.6, 0.9), (0.8, 1.0), (0.3, 0.6));
const INFERENCE: UsagePattern = pattern((0.5, 0.8), (0.4, 0.7), (0.6, 0.9), (0.2, 0.4));
const ETL: UsagePattern = pattern((0.5, 0.9), (0.4, 0.8), (0.0, 0.0), (0.6, 0.9));
const ANALYTICS: UsagePattern = pattern((0.6, 0.9), (0.7, 0.9), (0.0, 0.0), (0.3, 0.6));
const BATCH: UsagePattern = pattern((0.7, 1.0), (0.6, 0.9), (0.0, 0.0), (0.5, 0.8));
const STREAMING: UsagePattern = pattern((0.4, 0.7), (0.5, 0.8), (0.0, 0.0), (0.6, 0.9));

pub const JOB_PROFILES: [JobProfile; 5] = [
    JobProfile {
        job_type: JobType::DataProcessing,
        weight: 30,
        duration_minutes: (30, 180),
        cpu_cores: (4, 32),
        memory_gb: (8, 128),
        gpus: (0, 2),
        disk_gb: (100, 500),
        task_kinds: ["data_preparation", "processing", "aggregation"],
        usage: [INGESTION, PROCESSING, ETL],
    },
    JobProfile {
        job_type: JobType::MachineLearning,
        weight: 25,
        duration_minutes: (120, 720),
        cpu_cores: (8, 64),
        memory_gb: (16, 256),
        gpus: (1, 4),
        disk_gb: (200, 1000),
        task_kinds: ["data_preprocessing", "training", "evaluation"],
        usage: [PROCESSING, TRAINING, INFERENCE],
    },
    JobProfile {
        job_type: JobType::WebService,
        weight: 20,
        duration_minutes: (15, 120),
        cpu_cores: (2, 16),
        memory_gb: (4, 32),
        gpus: (0, 0),
        disk_gb: (50, 200),
        task_kinds: ["frontend", "backend", "database"],
        usage: [STREAMING, PROCESSING, ANALYTICS],
    },
    JobProfile {
        job_type: JobType::BatchProcessing,
        weight: 15,
        duration_minutes: (60, 360),
        cpu_cores: (16, 128),
        memory_gb: (32, 512),
        gpus: (0, 8),
        disk_gb: (500, 2000),
        task_kinds: ["data_collection", "analysis", "visualization"],
        usage: [INGESTION, BATCH, ANALYTICS],
    },
    JobProfile {
        job_type: JobType::Analytics,
        weight: 10,
        duration_minutes: (30, 180),
        cpu_cores: (4, 32),
        memory_gb: (16, 128),
        gpus: (0, 2),
        disk_gb: (200, 800),
        task_kinds: ["data_collection", "analysis", "visualization"],
        usage: [INGESTION, ANALYTICS, STREAMING],
    },
];

/// Profile for a job type.
pub fn profile(job_type: JobType) -> &'static JobProfile {
    match job_type {
        JobType::DataProcessing => &JOB_PROFILES[0],
        JobType::MachineLearning => &JOB_PROFILES[1],
        JobType::WebService => &JOB_PROFILES[2],
        JobType::BatchProcessing => &JOB_PROFILES[3],
        JobType::Analytics => &JOB_PROFILES[4],
    }
}

/// Usage pattern of a task kind under `job_type`; unknown kinds get
/// [`UsagePattern::DEFAULT`].
pub fn usage_pattern(job_type: JobType, kind: &str) -> UsagePattern {
    let range = profile(job_type);
    range
        .task_kinds
        .iter()
        .position(|k| *k == kind)
        .and_then(|idx| range.usage.get(idx).copied())
        .unwrap_or(UsagePattern::DEFAULT)
}

impl JobProfile {
    /// Uniform sample of the aggregate request. CPU and GPU are drawn in
    /// thousandths so fractional amounts occur.
    pub fn sample_request(&self, rng: &mut StdRng) -> Resources {
        Resources {
            cpu_millis: rng.gen_range(self.cpu_cores.0 * 1000..=self.cpu_cores.1 * 1000),
            memory_mb: rng.gen_range(self.memory_gb.0 * 1024..=self.memory_gb.1 * 1024),
            gpu_millis: rng.gen_range(self.gpus.0 * 1000..=self.gpus.1 * 1000),
            disk_gb: rng.gen_range(self.disk_gb.0..=self.disk_gb.1),
        }
    }

    pub fn sample_duration_minutes(&self, rng: &mut StdRng) -> i64 {
        rng.gen_range(self.duration_minutes.0..=self.duration_minutes.1)
    }

    pub fn sample_task_kind(&self, rng: &mut StdRng) -> &'static str {
        self.task_kinds[rng.gen_range(0..self.task_kinds.len())]
    }
}

/// Split `total` into `parts` shares that sum exactly to `total`.
///
/// Each share gets a random weight in 100..=300; every dimension is divided
/// proportionally and the last share absorbs the rounding remainder.
pub fn subdivide(total: Resources, parts: usize, rng: &mut StdRng) -> Vec<Resources> {
    if parts == 0 {
        return Vec::new();
    }
    let weights: Vec<u128> = (0..parts).map(|_| rng.gen_range(100u128..=300)).collect();
    let weight_sum: u128 = weights.iter().sum();
    let totals = total.dimensions();

    let mut shares = Vec::with_capacity(parts);
    let mut assigned = [0u64; 4];
    for (idx, weight) in weights.iter().enumerate() {
        let mut dims = [0u64; 4];
        for d in 0..4 {
            dims[d] = if idx + 1 == parts {
                totals[d] - assigned[d]
            } else {
                (u128::from(totals[d]) * weight / weight_sum) as u64
            };
            assigned[d] += dims[d];
        }
        shares.push(Resources::from_dimensions(dims));
    }
    shares
}
