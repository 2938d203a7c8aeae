// tests/resource_pool.rs

mod common;
use crate::common::builders::ClusterBuilder;
use crate::common::init_tracing;

use std::error::Error;

use proptest::prelude::*;

use cloudy::errors::CloudyError;
use cloudy::pool::{AllocationHandle, ResourcePool};
use cloudy::types::{AllocationId, Resources, VmId};

type TestResult = Result<(), Box<dyn Error>>;

fn small_vm() -> Resources {
    Resources::from_units(4, 8192, 1, 100)
}

#[test]
fn reserve_debits_headroom_and_release_restores_it() -> TestResult {
    init_tracing();

    let mut pool = ResourcePool::uniform(2, small_vm());
    let request = Resources::new(1500, 2048, 500, 10);

    let handle = pool.reserve(VmId(1), request)?;
    assert_eq!(handle.vm, VmId(1));
    assert_eq!(pool.headroom(VmId(1))?, small_vm().saturating_sub(&request));
    assert_eq!(pool.headroom(VmId(0))?, small_vm());
    assert_eq!(pool.allocated(VmId(1))?, request);
    assert_eq!(pool.allocation(handle), Some(request));
    pool.check_invariants()?;

    let released = pool.release(handle)?;
    assert_eq!(released, request);
    assert!(pool.total_allocated().is_zero());
    assert_eq!(pool.allocation(handle), None);
    pool.check_invariants()?;
    Ok(())
}

#[test]
fn reservation_is_all_or_nothing() -> TestResult {
    let mut pool = ResourcePool::uniform(1, small_vm());
    pool.reserve(VmId(0), Resources::from_units(3, 1024, 0, 10))?;
    let before = pool.vms().to_vec();

    // CPU fits, GPU does not.
    let err = pool
        .reserve(VmId(0), Resources::from_units(1, 1024, 2, 10))
        .unwrap_err();
    assert!(matches!(err, CloudyError::InsufficientResources(_)));
    assert_eq!(pool.vms(), before.as_slice());
    assert_eq!(pool.live_allocations(), 1);
    Ok(())
}

#[test]
fn double_release_is_reported() -> TestResult {
    let mut pool = ResourcePool::uniform(1, small_vm());
    let handle = pool.reserve(VmId(0), Resources::from_units(1, 0, 0, 0))?;
    pool.release(handle)?;

    match pool.release(handle) {
        Err(CloudyError::DoubleRelease(id)) => assert_eq!(id, handle.id),
        other => panic!("expected DoubleRelease, got {other:?}"),
    }
    assert!(pool.total_allocated().is_zero());
    assert!(CloudyError::DoubleRelease(handle.id).is_fatal());
    Ok(())
}

#[test]
fn foreign_handles_are_invariant_violations() -> TestResult {
    let mut pool = ResourcePool::uniform(2, small_vm());

    let never_issued = AllocationHandle {
        id: AllocationId(99),
        vm: VmId(0),
    };
    assert!(matches!(
        pool.release(never_issued),
        Err(CloudyError::InvariantViolation(_))
    ));

    let handle = pool.reserve(VmId(0), Resources::from_units(1, 0, 0, 0))?;
    let wrong_vm = AllocationHandle {
        id: handle.id,
        vm: VmId(1),
    };
    assert!(matches!(
        pool.release(wrong_vm),
        Err(CloudyError::InvariantViolation(_))
    ));
    // The real handle is still live and releasable.
    pool.release(handle)?;
    Ok(())
}

#[test]
fn unknown_vm_is_rejected() {
    let mut pool = ClusterBuilder::new().cpu_vm(4).build();
    assert!(matches!(
        pool.reserve(VmId(3), Resources::from_units(1, 0, 0, 0)),
        Err(CloudyError::UnknownVm(VmId(3)))
    ));
}

#[derive(Debug, Clone)]
enum Op {
    Reserve { vm: u32, cpu: u64, mem: u64 },
    Release { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..3, 0u64..3000, 0u64..6000).prop_map(|(vm, cpu, mem)| Op::Reserve { vm, cpu, mem }),
        any::<usize>().prop_map(|pick| Op::Release { pick }),
    ]
}

proptest! {
    #[test]
    fn allocated_never_exceeds_capacity(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut pool = ResourcePool::uniform(3, Resources::new(4000, 8192, 0, 0));
        let mut live: Vec<AllocationHandle> = Vec::new();

        for op in ops {
            match op {
                Op::Reserve { vm, cpu, mem } => {
                    let request = Resources::new(cpu, mem, 0, 0);
                    let fits = pool.vm(VmId(vm)).unwrap().can_fit(&request);
                    match pool.reserve(VmId(vm), request) {
                        Ok(handle) => {
                            prop_assert!(fits);
                            live.push(handle);
                        }
                        Err(CloudyError::InsufficientResources(_)) => prop_assert!(!fits),
                        Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                    }
                }
                Op::Release { pick } => {
                    if !live.is_empty() {
                        let handle = live.swap_remove(pick % live.len());
                        pool.release(handle).unwrap();
                        let is_double = matches!(pool.release(handle), Err(CloudyError::DoubleRelease(_)));
                        prop_assert!(is_double);
                    }
                }
            }

            pool.check_invariants().unwrap();
            for vm in pool.vms() {
                prop_assert!(vm.allocated.fits_within(&vm.capacity));
            }
        }

        prop_assert_eq!(pool.live_allocations(), live.len());
    }
}
