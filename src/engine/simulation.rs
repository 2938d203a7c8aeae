// src/engine/simulation.rs

//! Pure, synchronous tick loop for one seeded run.
//!
//! No Tokio, no IO: a [`Simulation`] owns its scheduler (and through it the
//! pool, graph and workload) plus its interruption stream, so any number of
//! them can run side by side.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::ConfigFile;
use crate::errors::{CloudyError, Result};
use crate::generator::{PopulationSummary, WorkloadGenerator};
use crate::injector::FailureInjector;
use crate::report::{
    InstanceRecord, Statistics, VerificationReport, fingerprint, instance_records,
    verify_workload_execution,
};
use crate::scheduler::{Scheduler, TickOutcome};
use crate::types::Status;

/// Offset between a run's generator seed and its interruption seed, so the
/// two random streams differ.
const INJECTOR_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// Everything a finished run produces.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub ticks: u64,
    pub population: PopulationSummary,
    /// Jobs per status at the horizon.
    pub status_summary: BTreeMap<Status, usize>,
    pub records: Vec<InstanceRecord>,
    pub stats: Statistics,
    pub verification: VerificationReport,
    pub fingerprint: String,
}

#[derive(Debug)]
pub struct Simulation {
    scheduler: Scheduler,
    injector: FailureInjector,
    population: PopulationSummary,
    seed: u64,
    clock: DateTime<Utc>,
    end: DateTime<Utc>,
    tick: TimeDelta,
    ticks: u64,
}

impl Simulation {
    /// Generate a population for `seed` and submit it to a fresh cluster.
    ///
    /// The clock starts at `reference_time` and the last tick falls on or
    /// before `reference_time + horizon`.
    pub fn from_config(
        cfg: &ConfigFile,
        seed: u64,
        reference_time: DateTime<Utc>,
    ) -> Result<Self> {
        let end = cfg.horizon_end(reference_time)?;
        let mut scheduler = Scheduler::new(cfg.cluster.pool()?);
        let request = cfg.generation_request(reference_time).with_seed(seed);
        let mut generator = WorkloadGenerator::new(request)?;
        let population = generator.feed(&mut scheduler)?;
        scheduler.check_invariants()?;

        let injector = FailureInjector::new(
            cfg.simulation.interruption_probability,
            seed.wrapping_add(INJECTOR_SEED_OFFSET),
        )?;

        Ok(Self {
            scheduler,
            injector,
            population,
            seed,
            clock: reference_time,
            end,
            tick: cfg.tick(),
            ticks: 0,
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn population(&self) -> &PopulationSummary {
        &self.population
    }

    pub fn clock(&self) -> DateTime<Utc> {
        self.clock
    }

    pub fn is_finished(&self) -> bool {
        self.clock > self.end
    }

    /// Run one tick and re-check every invariant.
    ///
    /// Returns `None` once the horizon has passed.
    pub fn step(&mut self) -> Result<Option<TickOutcome>> {
        if self.is_finished() {
            return Ok(None);
        }
        let outcome = self.scheduler.tick(self.clock, &mut self.injector)?;
        self.scheduler.check_invariants()?;
        self.clock += self.tick;
        self.ticks += 1;
        Ok(Some(outcome))
    }

    /// Tick to the horizon and build the report. Jobs still waiting or running
    /// are reported in their last state.
    pub fn run(mut self) -> Result<SimulationReport> {
        while self.step()?.is_some() {}
        self.report()
    }

    pub fn report(&self) -> Result<SimulationReport> {
        let workload = self.scheduler.workload();
        let records = instance_records(workload)?;
        let stats = Statistics::from_records(&records, self.tick, self.end);
        let verification = verify_workload_execution(workload, self.scheduler.history())?;
        if !verification.is_clean() {
            return Err(CloudyError::InvariantViolation(format!(
                "run with seed {} failed verification: {} dependency violations, {} invalid transitions",
                self.seed,
                verification.dependency_violations.len(),
                verification.invalid_transitions.len()
            )));
        }
        let fingerprint = fingerprint(&records)?;
        let status_summary = self.scheduler.status_summary();

        info!(
            seed = self.seed,
            ticks = self.ticks,
            jobs = stats.total_jobs,
            instances = stats.total_instances,
            %fingerprint,
            "simulation finished"
        );

        Ok(SimulationReport {
            seed: self.seed,
            ticks: self.ticks,
            population: self.population.clone(),
            status_summary,
            records,
            stats,
            verification,
            fingerprint,
        })
    }
}
