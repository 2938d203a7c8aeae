// src/injector.rs

//! Stochastic interruption of running instances.
//!
//! The scheduler asks an [`InterruptionSource`] which running instances to
//! interrupt and then takes them off their VMs itself; sources never touch
//! resources. [`FailureInjector`] is the production implementation; tests can
//! plug in a scripted source instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::errors::{CloudyError, Result};
use crate::types::InstanceId;

/// Decides which running instances are interrupted on a tick.
pub trait InterruptionSource {
    /// `running` is in ascending id order. Returned ids must be a subset.
    fn select(&mut self, running: &[InstanceId]) -> Vec<InstanceId>;
}

/// Flips each running instance to interrupted with an independent
/// probability per tick.
#[derive(Debug, Clone)]
pub struct FailureInjector {
    probability: f64,
    rng: StdRng,
}

impl FailureInjector {
    pub fn new(probability: f64, seed: u64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(CloudyError::InvalidParameters(format!(
                "interruption probability must be within [0, 1] (got {probability})"
            )));
        }
        Ok(Self {
            probability,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl InterruptionSource for FailureInjector {
    fn select(&mut self, running: &[InstanceId]) -> Vec<InstanceId> {
        // One draw per instance even at 0 or 1 so the stream stays aligned.
        let picked: Vec<InstanceId> = running
            .iter()
            .copied()
            .filter(|_| self.rng.gen_bool(self.probability))
            .collect();
        if !picked.is_empty() {
            trace!(count = picked.len(), "instances selected for interruption");
        }
        picked
    }
}
