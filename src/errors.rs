// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::{AllocationId, JobId, VmId};

#[derive(Error, Debug)]
pub enum CloudyError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Cycle detected: job {job} cannot depend on {dependency}")]
    CycleDetected { job: JobId, dependency: JobId },

    #[error("Insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("Double release of allocation {0}")]
    DoubleRelease(AllocationId),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Job not found: {0}")]
    UnknownJob(JobId),

    #[error("VM not found: {0}")]
    UnknownVm(VmId),

    #[error("Job already submitted: {0}")]
    DuplicateJob(JobId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CloudyError {
    /// Programming errors inside the core; a run that hits one must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CloudyError::DoubleRelease(_) | CloudyError::InvariantViolation(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CloudyError>;
