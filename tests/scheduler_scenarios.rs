// tests/scheduler_scenarios.rs

mod common;
use crate::common::builders::{ClusterBuilder, JobSpecBuilder};
use crate::common::fakes::ScriptedInterruptions;
use crate::common::{at, init_tracing, minutes};

use std::error::Error;

use cloudy::errors::CloudyError;
use cloudy::injector::FailureInjector;
use cloudy::model::Workload;
use cloudy::report::verify_workload_execution;
use cloudy::scheduler::{Admission, Scheduler, StatusChange, TransitionCause};
use cloudy::types::{InstanceId, JobId, Resources, Status, TaskId};

type TestResult = Result<(), Box<dyn Error>>;

fn cores(n: u64) -> Resources {
    Resources::from_units(n, 0, 0, 0)
}

#[test]
fn dependent_job_waits_for_its_dependency_to_terminate() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(8).build());
    sched.submit(JobSpecBuilder::new(1).cpu_task(2, minutes(60)).build())?;
    sched.submit(JobSpecBuilder::new(2).depends_on(1).cpu_task(2, minutes(30)).build())?;

    let mut none = ScriptedInterruptions::none();
    let first = sched.tick(at(0), &mut none)?;
    assert_eq!(first.admitted, vec![JobId(1)]);
    assert_eq!(first.blocked, vec![JobId(2)]);

    for m in (5..60).step_by(5) {
        let outcome = sched.tick(at(m), &mut none)?;
        assert!(outcome.admitted.is_empty(), "nothing new may start at minute {m}");
        assert_eq!(sched.status_of(JobId(2)), Some(Status::Waiting));
        sched.check_invariants()?;
    }

    let done = sched.tick(at(60), &mut none)?;
    assert_eq!(done.completed, vec![InstanceId(0)]);
    assert_eq!(done.admitted, vec![JobId(2)]);

    let a = sched.workload().job(JobId(1))?;
    let b = sched.workload().job(JobId(2))?;
    assert_eq!(a.status, Status::Terminated);
    assert_eq!(a.end_time, Some(at(60)));
    assert_eq!(b.status, Status::Running);
    assert_eq!(b.start_time, Some(at(60)));

    let report = verify_workload_execution(sched.workload(), sched.history())?;
    assert!(report.is_clean(), "{report:?}");
    Ok(())
}

#[test]
fn higher_priority_job_is_admitted_first() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).priority(5).cpu_task(3, minutes(60)).build())?;
    sched.submit(JobSpecBuilder::new(2).priority(10).cpu_task(3, minutes(60)).build())?;

    let outcome = sched.tick(at(0), &mut ScriptedInterruptions::none())?;

    assert_eq!(outcome.admitted, vec![JobId(2)]);
    assert_eq!(outcome.deferred, vec![JobId(1)]);
    assert!(outcome.preempted.is_empty());
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Waiting));
    assert_eq!(sched.pool().total_allocated(), cores(3));
    Ok(())
}

#[test]
fn late_high_priority_job_preempts_and_victim_is_requeued() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).priority(5).cpu_task(3, minutes(120)).build())?;
    sched.submit(
        JobSpecBuilder::new(2)
            .priority(10)
            .submitted_at(at(5))
            .cpu_task(3, minutes(120))
            .build(),
    )?;
    let mut none = ScriptedInterruptions::none();

    let t0 = sched.tick(at(0), &mut none)?;
    assert_eq!(t0.admitted, vec![JobId(1)]);

    let t5 = sched.tick(at(5), &mut none)?;
    assert_eq!(t5.preempted, vec![JobId(1)]);
    assert_eq!(t5.admitted, vec![JobId(2)]);
    let victim = sched.workload().job(JobId(1))?;
    assert_eq!(victim.status, Status::Interrupted);
    assert!(victim.preempted);
    assert_eq!(victim.preemptions, 1);
    assert_eq!(sched.workload().instance(InstanceId(0))?.end_time, Some(at(5)));
    assert_eq!(sched.pool().total_allocated(), cores(3));
    sched.check_invariants()?;

    let t10 = sched.tick(at(10), &mut none)?;
    assert_eq!(t10.requeued, vec![JobId(1)]);
    assert_eq!(t10.deferred, vec![JobId(1)]);
    let victim = sched.workload().job(JobId(1))?;
    assert_eq!(victim.status, Status::Waiting);
    assert!(!victim.preempted);
    assert_eq!(victim.submit_time, at(0));
    assert!(victim.start_time.is_none());

    let causes: Vec<TransitionCause> = sched
        .history()
        .iter()
        .filter(|c| c.job == JobId(1))
        .map(|c| c.cause)
        .collect();
    assert_eq!(
        causes,
        vec![
            TransitionCause::Dispatch,
            TransitionCause::Preemption,
            TransitionCause::Requeue
        ]
    );
    Ok(())
}

#[test]
fn injected_interruption_survives_a_later_preemption() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).priority(1).task(cores(2), 2, minutes(120)).build())?;
    sched.submit(
        JobSpecBuilder::new(2)
            .priority(10)
            .submitted_at(at(10))
            .cpu_task(4, minutes(60))
            .build(),
    )?;
    let mut script = ScriptedInterruptions::none().then([]).then([0]);

    sched.tick(at(0), &mut script)?;
    let t5 = sched.tick(at(5), &mut script)?;
    assert_eq!(t5.interrupted, vec![InstanceId(0)]);
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Running));

    let t10 = sched.tick(at(10), &mut script)?;
    assert_eq!(t10.preempted, vec![JobId(1)]);
    assert!(sched.workload().instance(InstanceId(1))?.evicted);
    assert!(!sched.workload().instance(InstanceId(0))?.evicted);

    let t15 = sched.tick(at(15), &mut script)?;
    assert!(t15.requeued.is_empty());
    let first = sched.workload().instance(InstanceId(0))?;
    let second = sched.workload().instance(InstanceId(1))?;
    assert_eq!(first.status, Status::Interrupted);
    assert_eq!(first.end_time, Some(at(5)));
    assert_eq!(second.status, Status::Interrupted);
    assert!(!second.evicted);

    let victim = sched.workload().job(JobId(1))?;
    assert_eq!(victim.status, Status::Interrupted);
    assert!(!victim.preempted);
    assert_eq!(victim.end_time, Some(at(10)));
    sched.check_invariants()?;

    // Nothing of job 1 comes back once job 2 is done.
    for m in (20..=120).step_by(10) {
        let outcome = sched.tick(at(m), &mut script)?;
        assert!(!outcome.admitted.contains(&JobId(1)));
    }
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Interrupted));

    let causes: Vec<TransitionCause> = sched
        .history()
        .iter()
        .filter(|c| c.instance == InstanceId(0))
        .map(|c| c.cause)
        .collect();
    assert_eq!(
        causes,
        vec![TransitionCause::Dispatch, TransitionCause::Interruption]
    );

    let report = verify_workload_execution(sched.workload(), sched.history())?;
    assert!(report.is_clean(), "{report:?}");
    Ok(())
}

#[test]
fn requeue_after_injected_interruption_is_flagged() -> TestResult {
    let change = |minute, from, to, cause| StatusChange {
        time: at(minute),
        job: JobId(1),
        task: TaskId(0),
        instance: InstanceId(0),
        from,
        to,
        cause,
    };
    let history = vec![
        change(0, Status::Waiting, Status::Running, TransitionCause::Dispatch),
        change(5, Status::Running, Status::Interrupted, TransitionCause::Interruption),
        change(10, Status::Interrupted, Status::Waiting, TransitionCause::Requeue),
    ];

    let report = verify_workload_execution(&Workload::new(), &history)?;
    assert_eq!(report.invalid_transitions, vec![history[2].clone()]);
    Ok(())
}

#[test]
fn evicts_lowest_priority_latest_submitted_first() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(6).build());
    sched.submit(JobSpecBuilder::new(1).priority(2).cpu_task(2, minutes(120)).build())?;
    sched.submit(
        JobSpecBuilder::new(2)
            .priority(2)
            .submitted_at(at(1))
            .cpu_task(2, minutes(120))
            .build(),
    )?;
    sched.submit(JobSpecBuilder::new(3).priority(3).cpu_task(2, minutes(120)).build())?;
    sched.submit(
        JobSpecBuilder::new(4)
            .priority(5)
            .submitted_at(at(2))
            .cpu_task(2, minutes(120))
            .build(),
    )?;
    let mut none = ScriptedInterruptions::none();

    let t1 = sched.tick(at(1), &mut none)?;
    assert_eq!(t1.admitted, vec![JobId(3), JobId(1), JobId(2)]);

    let t2 = sched.tick(at(2), &mut none)?;
    assert_eq!(t2.preempted, vec![JobId(2)]);
    assert_eq!(t2.admitted, vec![JobId(4)]);
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Running));
    assert_eq!(sched.status_of(JobId(3)), Some(Status::Running));
    sched.check_invariants()?;
    Ok(())
}

#[test]
fn no_preemption_when_eviction_cannot_make_room() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).priority(1).cpu_task(2, minutes(120)).build())?;
    sched.submit(
        JobSpecBuilder::new(2)
            .priority(9)
            .submitted_at(at(1))
            .cpu_task(5, minutes(60))
            .build(),
    )?;
    let mut none = ScriptedInterruptions::none();

    sched.tick(at(0), &mut none)?;
    let outcome = sched.tick(at(1), &mut none)?;

    assert!(outcome.preempted.is_empty());
    assert_eq!(outcome.deferred, vec![JobId(2)]);
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Running));
    Ok(())
}

#[test]
fn equal_priority_never_preempts() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).priority(5).cpu_task(3, minutes(120)).build())?;
    sched.submit(
        JobSpecBuilder::new(2)
            .priority(5)
            .submitted_at(at(1))
            .cpu_task(3, minutes(60))
            .build(),
    )?;
    let mut none = ScriptedInterruptions::none();

    sched.tick(at(0), &mut none)?;
    let outcome = sched.tick(at(1), &mut none)?;

    assert!(outcome.preempted.is_empty());
    assert_eq!(outcome.deferred, vec![JobId(2)]);
    Ok(())
}

#[test]
fn certain_interruption_releases_everything() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(16).build());
    for id in 0..4 {
        sched.submit(
            JobSpecBuilder::new(id)
                .task(cores(4), 2, minutes(120))
                .build(),
        )?;
    }
    let mut injector = FailureInjector::new(1.0, 99)?;

    let t0 = sched.tick(at(0), &mut ScriptedInterruptions::none())?;
    assert_eq!(t0.admitted.len(), 4);
    assert_eq!(sched.pool().total_allocated(), cores(16));

    let t5 = sched.tick(at(5), &mut injector)?;
    assert_eq!(t5.interrupted.len(), 8);
    assert!(sched.pool().total_allocated().is_zero());
    assert_eq!(sched.pool().live_allocations(), 0);
    for inst in sched.workload().instances() {
        assert_eq!(inst.status, Status::Interrupted);
        assert!(inst.handle.is_none());
        assert_eq!(inst.end_time, Some(at(5)));
    }
    assert_eq!(sched.status_summary()[&Status::Interrupted], 4);

    // Failure interruptions are final: nothing comes back.
    let t10 = sched.tick(at(10), &mut injector)?;
    assert!(t10.requeued.is_empty());
    assert!(t10.admitted.is_empty());
    sched.check_invariants()?;
    Ok(())
}

#[test]
fn scripted_interruption_hits_only_named_instances() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(8).build());
    sched.submit(JobSpecBuilder::new(1).task(cores(4), 2, minutes(60)).build())?;

    let mut script = ScriptedInterruptions::none().then([]).then([1, 7]);
    sched.tick(at(0), &mut script)?;
    let outcome = sched.tick(at(5), &mut script)?;

    assert_eq!(outcome.interrupted, vec![InstanceId(1)]);
    assert_eq!(script.offered[1], vec![InstanceId(0), InstanceId(1)]);
    assert_eq!(sched.workload().instance(InstanceId(0))?.status, Status::Running);
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Running));
    assert_eq!(sched.pool().total_allocated(), cores(2));

    // The survivor completes; the job ends interrupted.
    sched.tick(at(60), &mut script)?;
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Interrupted));
    Ok(())
}

#[test]
fn instances_complete_at_their_due_time() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).cpu_task(1, minutes(30)).build())?;
    let mut none = ScriptedInterruptions::none();

    sched.tick(at(0), &mut none)?;
    assert!(sched.tick(at(20), &mut none)?.completed.is_empty());

    let outcome = sched.tick(at(45), &mut none)?;
    assert_eq!(outcome.completed, vec![InstanceId(0)]);
    let inst = sched.workload().instance(InstanceId(0))?;
    assert_eq!(inst.status, Status::Terminated);
    assert_eq!(inst.end_time, Some(at(30)));
    assert_eq!(inst.attempts, 1);
    assert!(sched.pool().total_allocated().is_zero());

    let last = sched.history().last().ok_or("empty history")?;
    assert_eq!(last.cause, TransitionCause::Completion);
    assert_eq!(last.time, at(30));
    Ok(())
}

#[test]
fn usage_ramps_while_running_and_settles_on_completion() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(8).build());
    sched.submit(JobSpecBuilder::new(1).cpu_task(4, minutes(60)).build())?;
    let mut none = ScriptedInterruptions::none();
    let usage = |sched: &Scheduler| -> Result<_, CloudyError> {
        let inst = sched.workload().instance(InstanceId(0))?;
        Ok((inst.peak_usage, inst.final_usage))
    };

    sched.tick(at(0), &mut none)?;
    assert_eq!(usage(&sched)?, (Resources::new(2000, 0, 0, 0), None));

    sched.tick(at(30), &mut none)?;
    assert_eq!(usage(&sched)?, (Resources::new(2600, 0, 0, 0), None));

    sched.tick(at(60), &mut none)?;
    assert_eq!(
        usage(&sched)?,
        (
            Resources::new(3200, 0, 0, 0),
            Some(Resources::new(2600, 0, 0, 0))
        )
    );
    Ok(())
}

#[test]
fn requeue_clears_usage_of_the_evicted_run() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).priority(1).cpu_task(4, minutes(60)).build())?;
    sched.submit(
        JobSpecBuilder::new(2)
            .priority(9)
            .submitted_at(at(10))
            .cpu_task(4, minutes(60))
            .build(),
    )?;
    let mut none = ScriptedInterruptions::none();

    sched.tick(at(0), &mut none)?;
    sched.tick(at(10), &mut none)?;
    let evicted = sched.workload().instance(InstanceId(0))?;
    assert!(evicted.final_usage.is_some());
    assert!(!evicted.peak_usage.is_zero());

    sched.tick(at(20), &mut none)?;
    let requeued = sched.workload().instance(InstanceId(0))?;
    assert_eq!(requeued.status, Status::Waiting);
    assert!(requeued.peak_usage.is_zero());
    assert!(requeued.final_usage.is_none());
    Ok(())
}

#[test]
fn running_jobs_are_adopted_when_they_fit() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    let admission = sched.submit(
        JobSpecBuilder::new(1)
            .running_since(at(-30))
            .cpu_task(2, minutes(60))
            .build(),
    )?;

    assert_eq!(admission, Admission::Adopted);
    assert_eq!(sched.pool().total_allocated(), cores(2));
    let inst = sched.workload().instance(InstanceId(0))?;
    assert!(inst.handle.is_some());
    assert_eq!(inst.due, Some(at(30)));
    sched.check_invariants()?;

    let outcome = sched.tick(at(30), &mut ScriptedInterruptions::none())?;
    assert_eq!(outcome.completed, vec![InstanceId(0)]);
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Terminated));
    Ok(())
}

#[test]
fn running_jobs_are_demoted_when_they_cannot_be_bound() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    let too_big = sched.submit(
        JobSpecBuilder::new(1)
            .running_since(at(-30))
            .cpu_task(8, minutes(60))
            .build(),
    )?;
    assert_eq!(too_big, Admission::Demoted);

    sched.submit(JobSpecBuilder::new(2).build())?;
    let blocked = sched.submit(
        JobSpecBuilder::new(3)
            .depends_on(2)
            .running_since(at(-10))
            .build(),
    )?;
    assert_eq!(blocked, Admission::Demoted);

    for id in [1, 3] {
        let job = sched.workload().job(JobId(id))?;
        assert_eq!(job.status, Status::Waiting);
        assert!(job.start_time.is_none());
        for inst in sched.workload().instances_of(JobId(id))? {
            let inst = sched.workload().instance(inst)?;
            assert!(inst.allocated.is_zero());
            assert!(inst.start_time.is_none());
        }
    }
    assert!(sched.pool().total_allocated().is_zero());
    sched.check_invariants()?;
    Ok(())
}

#[test]
fn terminal_jobs_are_kept_as_history_only() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    let admission = sched.submit(
        JobSpecBuilder::new(1)
            .finished(Status::Failed, at(-120), at(-90))
            .build(),
    )?;
    assert_eq!(admission, Admission::Historical);
    assert!(sched.pool().total_allocated().is_zero());

    let outcome = sched.tick(at(0), &mut ScriptedInterruptions::none())?;
    assert!(outcome.admitted.is_empty());
    let job = sched.workload().job(JobId(1))?;
    assert_eq!(job.status, Status::Failed);
    assert_eq!(job.end_time, Some(at(-90)));
    assert!(sched.history().is_empty());
    Ok(())
}

#[test]
fn duplicate_and_invalid_submissions_leave_no_trace() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).build())?;

    assert!(matches!(
        sched.submit(JobSpecBuilder::new(1).priority(9).build()),
        Err(CloudyError::DuplicateJob(JobId(1)))
    ));
    assert_eq!(sched.workload().job(JobId(1))?.priority, 1);

    let before = sched.graph().snapshot();
    let mut empty = JobSpecBuilder::new(2).depends_on(9).build();
    empty.tasks.clear();
    assert!(matches!(
        sched.submit(empty),
        Err(CloudyError::InvalidParameters(_))
    ));

    let mut over_shared = JobSpecBuilder::new(3).build();
    over_shared.tasks[0].instances.push(cores(1));
    assert!(matches!(
        sched.submit(over_shared),
        Err(CloudyError::InvalidParameters(_))
    ));

    assert_eq!(sched.graph().snapshot(), before);
    assert!(!sched.graph().contains(JobId(9)));
    assert_eq!(sched.workload().len(), 1);
    Ok(())
}

#[test]
fn cycle_rejection_at_submit_keeps_workload_unchanged() -> TestResult {
    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(4).build());
    sched.submit(JobSpecBuilder::new(1).depends_on(2).build())?;

    assert!(matches!(
        sched.submit(JobSpecBuilder::new(2).depends_on(1).build()),
        Err(CloudyError::CycleDetected { .. })
    ));
    assert_eq!(sched.workload().len(), 1);
    assert!(!sched.workload().contains(JobId(2)));

    // Job 1 depends on a job that never arrives: it stays blocked.
    let outcome = sched.tick(at(0), &mut ScriptedInterruptions::none())?;
    assert_eq!(outcome.blocked, vec![JobId(1)]);
    Ok(())
}

#[test]
fn mixed_run_history_verifies_clean() -> TestResult {
    init_tracing();

    let mut sched = Scheduler::new(ClusterBuilder::new().cpu_vm(6).cpu_vm(6).build());
    sched.submit(JobSpecBuilder::new(0).priority(1).task(cores(4), 2, minutes(40)).build())?;
    sched.submit(JobSpecBuilder::new(1).priority(1).cpu_task(5, minutes(90)).build())?;
    sched.submit(
        JobSpecBuilder::new(2)
            .priority(4)
            .submitted_at(at(10))
            .cpu_task(6, minutes(30))
            .build(),
    )?;
    sched.submit(JobSpecBuilder::new(3).depends_on(0).cpu_task(2, minutes(20)).build())?;
    sched.submit(JobSpecBuilder::new(4).depends_on(2).depends_on(3).build())?;

    // Job 1 is evicted at minute 10, requeued, re-dispatched at minute 40
    // and then fails for good at minute 50.
    let mut script = ScriptedInterruptions::none();
    for _ in 0..5 {
        script = script.then([]);
    }
    let mut script = script.then([2]);

    for m in (0..=240).step_by(10) {
        sched.tick(at(m), &mut script)?;
        sched.check_invariants()?;
    }

    let report = verify_workload_execution(sched.workload(), sched.history())?;
    assert!(report.is_clean(), "{report:?}");

    let causes: Vec<TransitionCause> = sched
        .history()
        .iter()
        .filter(|c| c.instance == InstanceId(2))
        .map(|c| c.cause)
        .collect();
    assert_eq!(
        causes,
        vec![
            TransitionCause::Dispatch,
            TransitionCause::Preemption,
            TransitionCause::Requeue,
            TransitionCause::Dispatch,
            TransitionCause::Interruption,
        ]
    );
    assert_eq!(sched.workload().instance(InstanceId(2))?.attempts, 2);
    assert_eq!(sched.status_of(JobId(1)), Some(Status::Interrupted));
    for id in [0, 2, 3, 4] {
        assert_eq!(sched.status_of(JobId(id)), Some(Status::Terminated));
    }
    assert_eq!(sched.workload().job(JobId(4))?.start_time, Some(at(60)));
    assert!(sched.pool().total_allocated().is_zero());
    Ok(())
}
