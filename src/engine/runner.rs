// src/engine/runner.rs

//! Async shell: several independent runs on Tokio's blocking pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::engine::simulation::{Simulation, SimulationReport};
use crate::errors::{CloudyError, Error, Result};

/// Run one simulation per seed in parallel.
///
/// Runs share only the configuration; each builds its own pool, graph and
/// workload. Reports come back in `seeds` order. The first failing run
/// aborts the rest.
pub async fn run_many(
    cfg: ConfigFile,
    seeds: Vec<u64>,
    reference_time: DateTime<Utc>,
) -> Result<Vec<SimulationReport>> {
    let cfg = Arc::new(cfg);
    let mut set = JoinSet::new();

    info!(runs = seeds.len(), "starting simulations");
    for (idx, seed) in seeds.iter().copied().enumerate() {
        let cfg = Arc::clone(&cfg);
        set.spawn_blocking(move || {
            debug!(seed, "simulation started");
            let report = Simulation::from_config(&cfg, seed, reference_time)?.run()?;
            Ok::<_, CloudyError>((idx, report))
        });
    }

    let mut slots: Vec<Option<SimulationReport>> = seeds.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (idx, report) = joined.map_err(Error::from)??;
        slots[idx] = Some(report);
    }

    slots
        .into_iter()
        .zip(seeds)
        .map(|(slot, seed)| {
            slot.ok_or_else(|| {
                CloudyError::InvariantViolation(format!("run with seed {seed} produced no report"))
            })
        })
        .collect()
}
