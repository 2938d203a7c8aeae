// src/types.rs

//! Shared identifiers, status vocabulary and resource quantities.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Job identifier. Assigned by whoever builds the job (generator or caller).
    JobId(u32),
    "job"
);
id_type!(
    /// Index of a task in the workload arena.
    TaskId(usize),
    "task"
);
id_type!(
    /// Index of an instance in the workload arena.
    InstanceId(usize),
    "instance"
);
id_type!(VmId(u32), "vm");
id_type!(
    /// Identifier of a single reservation in the resource pool.
    AllocationId(u64),
    "alloc"
);

/// Lifecycle status shared by jobs, tasks and instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Waiting,
    Running,
    Terminated,
    Failed,
    Interrupted,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Waiting,
        Status::Running,
        Status::Terminated,
        Status::Failed,
        Status::Interrupted,
    ];

    /// Terminated, failed and interrupted are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Terminated | Status::Failed | Status::Interrupted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Waiting => "waiting",
            Status::Running => "running",
            Status::Terminated => "terminated",
            Status::Failed => "failed",
            Status::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waiting" => Ok(Status::Waiting),
            "running" => Ok(Status::Running),
            "terminated" => Ok(Status::Terminated),
            "failed" => Ok(Status::Failed),
            "interrupted" => Ok(Status::Interrupted),
            other => Err(format!(
                "invalid status: {other} (expected waiting, running, terminated, failed or interrupted)"
            )),
        }
    }
}

/// Job taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    DataProcessing,
    MachineLearning,
    WebService,
    BatchProcessing,
    Analytics,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::DataProcessing,
        JobType::MachineLearning,
        JobType::WebService,
        JobType::BatchProcessing,
        JobType::Analytics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::DataProcessing => "data-processing",
            JobType::MachineLearning => "machine-learning",
            JobType::WebService => "web-service",
            JobType::BatchProcessing => "batch-processing",
            JobType::Analytics => "analytics",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("invalid job type: {s}"))
    }
}

/// A four-dimensional resource quantity.
///
/// CPU and GPU are stored in thousandths of a unit so fractional GPUs stay
/// exact; memory is in MiB and disk in GiB. Integer storage keeps headroom
/// checks and subdivision sums exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
    pub cpu_millis: u64,
    pub memory_mb: u64,
    pub gpu_millis: u64,
    pub disk_gb: u64,
}

impl Resources {
    pub const ZERO: Resources = Resources {
        cpu_millis: 0,
        memory_mb: 0,
        gpu_millis: 0,
        disk_gb: 0,
    };

    pub fn new(cpu_millis: u64, memory_mb: u64, gpu_millis: u64, disk_gb: u64) -> Self {
        Self {
            cpu_millis,
            memory_mb,
            gpu_millis,
            disk_gb,
        }
    }

    /// Build from whole units: cores, MiB, GPUs, GiB. Saturates at
    /// `u64::MAX` millis; see [`Resources::checked_from_units`].
    pub fn from_units(cpu_cores: u64, memory_mb: u64, gpus: u64, disk_gb: u64) -> Self {
        Self::new(
            cpu_cores.saturating_mul(1000),
            memory_mb,
            gpus.saturating_mul(1000),
            disk_gb,
        )
    }

    /// Like [`Resources::from_units`], but `None` if a unit count does not
    /// fit in millis.
    pub fn checked_from_units(
        cpu_cores: u64,
        memory_mb: u64,
        gpus: u64,
        disk_gb: u64,
    ) -> Option<Self> {
        Some(Self::new(
            cpu_cores.checked_mul(1000)?,
            memory_mb,
            gpus.checked_mul(1000)?,
            disk_gb,
        ))
    }

    pub fn cpu_cores(&self) -> f64 {
        self.cpu_millis as f64 / 1000.0
    }

    pub fn gpu_units(&self) -> f64 {
        self.gpu_millis as f64 / 1000.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// True if every dimension of `self` is ≤ the same dimension of `limit`.
    pub fn fits_within(&self, limit: &Resources) -> bool {
        self.cpu_millis <= limit.cpu_millis
            && self.memory_mb <= limit.memory_mb
            && self.gpu_millis <= limit.gpu_millis
            && self.disk_gb <= limit.disk_gb
    }

    /// Per-dimension subtraction; `None` if any dimension would go negative.
    pub fn checked_sub(&self, other: &Resources) -> Option<Resources> {
        Some(Resources {
            cpu_millis: self.cpu_millis.checked_sub(other.cpu_millis)?,
            memory_mb: self.memory_mb.checked_sub(other.memory_mb)?,
            gpu_millis: self.gpu_millis.checked_sub(other.gpu_millis)?,
            disk_gb: self.disk_gb.checked_sub(other.disk_gb)?,
        })
    }

    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        Resources {
            cpu_millis: self.cpu_millis.saturating_sub(other.cpu_millis),
            memory_mb: self.memory_mb.saturating_sub(other.memory_mb),
            gpu_millis: self.gpu_millis.saturating_sub(other.gpu_millis),
            disk_gb: self.disk_gb.saturating_sub(other.disk_gb),
        }
    }

    /// The dimensions as an array, in cpu/memory/gpu/disk order.
    /// Per-dimension maximum of two quantities.
    pub fn max_each(&self, other: &Resources) -> Resources {
        Resources {
            cpu_millis: self.cpu_millis.max(other.cpu_millis),
            memory_mb: self.memory_mb.max(other.memory_mb),
            gpu_millis: self.gpu_millis.max(other.gpu_millis),
            disk_gb: self.disk_gb.max(other.disk_gb),
        }
    }

    pub fn dimensions(&self) -> [u64; 4] {
        [self.cpu_millis, self.memory_mb, self.gpu_millis, self.disk_gb]
    }

    pub fn from_dimensions(dims: [u64; 4]) -> Self {
        Self::new(dims[0], dims[1], dims[2], dims[3])
    }
}

impl Add for Resources {
    type Output = Resources;

    fn add(self, rhs: Resources) -> Resources {
        Resources {
            cpu_millis: self.cpu_millis + rhs.cpu_millis,
            memory_mb: self.memory_mb + rhs.memory_mb,
            gpu_millis: self.gpu_millis + rhs.gpu_millis,
            disk_gb: self.disk_gb + rhs.disk_gb,
        }
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, rhs: Resources) {
        *self = *self + rhs;
    }
}

impl Sum for Resources {
    fn sum<I: Iterator<Item = Resources>>(iter: I) -> Resources {
        iter.fold(Resources::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Resources> for Resources {
    fn sum<I: Iterator<Item = &'a Resources>>(iter: I) -> Resources {
        iter.copied().sum()
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cpu={:.3} mem={}MiB gpu={:.3} disk={}GiB",
            self.cpu_cores(),
            self.memory_mb,
            self.gpu_units(),
            self.disk_gb
        )
    }
}
