// src/report/mod.rs

//! Output of a run: flat instance records, aggregate statistics, execution
//! verification and a digest of the record stream.

pub mod records;
pub mod stats;
pub mod verify;

use crate::errors::Result;

pub use records::{InstanceRecord, instance_records};
pub use stats::{Statistics, TimelinePoint};
pub use verify::{DependencyViolation, VerificationReport, verify_workload_execution};

/// blake3 digest of the records serialized as JSON lines.
///
/// Equal digests mean byte-identical exports.
pub fn fingerprint(records: &[InstanceRecord]) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    for record in records {
        serde_json::to_writer(&mut hasher, record)?;
        hasher.update(b"\n");
    }
    Ok(hasher.finalize().to_hex().to_string())
}
