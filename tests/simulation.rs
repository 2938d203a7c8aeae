// tests/simulation.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, reference_time, with_timeout};

use std::error::Error;

use cloudy::engine::{Simulation, run_many};
use cloudy::generator::StatusWeights;
use cloudy::report::Statistics;
use cloudy::types::Status;

type TestResult = Result<(), Box<dyn Error>>;

fn small_config() -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .jobs(120)
        .shape(3, 2)
        .horizon_hours(12)
        .tick_minutes(10)
        .dependency_probability(0.3)
}

#[test]
fn every_tick_keeps_invariants() -> TestResult {
    init_tracing();

    let cfg = small_config().interruption_probability(0.02).build();
    let mut sim = Simulation::from_config(&cfg, 7, reference_time())?;
    let population = sim.population().clone();
    assert_eq!(population.generated, 120);

    let mut ticks = 0;
    let mut admitted = 0;
    while let Some(outcome) = sim.step()? {
        assert_eq!(outcome.time, sim.clock() - cfg.tick());
        admitted += outcome.admitted.len();
        ticks += 1;
    }

    // 12 hours of 10-minute ticks, both ends included.
    assert_eq!(ticks, 73);
    assert!(sim.is_finished());
    assert!(admitted > 0);
    assert!(sim.step()?.is_none());

    let report = sim.report()?;
    assert_eq!(report.ticks, 73);
    assert!(report.verification.is_clean());
    assert_eq!(report.records.len(), sim.scheduler().workload().instances().len());
    assert_eq!(report.status_summary.values().sum::<usize>(), report.stats.total_jobs);
    Ok(())
}

#[test]
fn same_seed_same_fingerprint() -> TestResult {
    let cfg = small_config().interruption_probability(0.05).build();

    let a = Simulation::from_config(&cfg, 21, reference_time())?.run()?;
    let b = Simulation::from_config(&cfg, 21, reference_time())?.run()?;
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.records, b.records);

    let c = Simulation::from_config(&cfg, 22, reference_time())?.run()?;
    assert_ne!(a.fingerprint, c.fingerprint);
    Ok(())
}

#[test]
fn waiting_population_drains_without_interruptions() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .jobs(40)
        .shape(2, 2)
        .status_weights(StatusWeights::all_waiting())
        .dependency_probability(0.0)
        .interruption_probability(0.0)
        .horizon_hours(96)
        .tick_minutes(15)
        .build();
    let report = Simulation::from_config(&cfg, 3, reference_time())?.run()?;

    assert_eq!(report.population.queued, 40);
    assert_eq!(report.status_summary[&Status::Terminated], 40);
    for record in &report.records {
        assert_eq!(record.status, Status::Terminated);
        assert!(record.vm_id.is_some());
        let start = record.start_time.ok_or("terminated without start")?;
        assert!(record.submit_time <= start);
    }
    Ok(())
}

#[test]
fn statistics_derive_from_records_alone() -> TestResult {
    let cfg = small_config().build();
    let report = Simulation::from_config(&cfg, 9, reference_time())?.run()?;

    let recomputed =
        Statistics::from_records(&report.records, cfg.tick(), reference_time() + cfg.horizon());
    assert_eq!(recomputed, report.stats);

    let type_total: usize = report.stats.job_types.values().sum();
    assert_eq!(type_total, report.stats.total_jobs);
    let status_total: usize = report.stats.instance_statuses.values().sum();
    assert_eq!(status_total, report.stats.total_instances);

    assert!(report.stats.total_peak_usage.fits_within(&report.stats.total_allocated));
    assert!(report.stats.timeline.iter().all(|p| p.used.fits_within(&p.usage)));
    assert!(report.stats.timeline.iter().any(|p| !p.used.is_zero()));
    for record in &report.records {
        assert!(record.used().fits_within(&record.allocated()));
        assert_eq!(record.final_usage.is_some(), record.end_time.is_some());
    }
    Ok(())
}

#[tokio::test]
async fn run_many_returns_reports_in_seed_order() -> TestResult {
    init_tracing();

    let cfg = small_config().jobs(60).build();
    let seeds = vec![30, 10, 20];
    let reports = with_timeout(run_many(cfg.clone(), seeds.clone(), reference_time())).await?;

    let got: Vec<u64> = reports.iter().map(|r| r.seed).collect();
    assert_eq!(got, seeds);

    let single = Simulation::from_config(&cfg, 10, reference_time())?.run()?;
    assert_eq!(reports[1].fingerprint, single.fingerprint);
    Ok(())
}
