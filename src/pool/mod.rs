// src/pool/mod.rs

//! Resource pool: per-VM capacity accounting.
//!
//! Every reservation is all-or-nothing across the four resource dimensions
//! and yields an [`AllocationHandle`]. Handles are plain ids; the pool keeps
//! the authoritative table of live reservations, so a handle released twice
//! is detected and reported as [`CloudyError::DoubleRelease`].

pub mod vm;

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::errors::{CloudyError, Result};
use crate::types::{AllocationId, Resources, VmId};

pub use vm::Vm;

/// Receipt for one reservation on one VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationHandle {
    pub id: AllocationId,
    pub vm: VmId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiveAllocation {
    vm: VmId,
    resources: Resources,
}

#[derive(Debug, Clone)]
pub struct ResourcePool {
    vms: Vec<Vm>,
    live: BTreeMap<AllocationId, LiveAllocation>,
    next_allocation: u64,
}

impl ResourcePool {
    /// Build a pool with one VM per capacity, numbered from 0.
    pub fn new(capacities: impl IntoIterator<Item = Resources>) -> Self {
        let vms = capacities
            .into_iter()
            .enumerate()
            .map(|(idx, capacity)| Vm::new(VmId(idx as u32), capacity))
            .collect();

        Self {
            vms,
            live: BTreeMap::new(),
            next_allocation: 0,
        }
    }

    /// `count` identical VMs.
    pub fn uniform(count: usize, capacity: Resources) -> Self {
        Self::new(std::iter::repeat_n(capacity, count))
    }

    pub fn vms(&self) -> &[Vm] {
        &self.vms
    }

    pub fn vm(&self, id: VmId) -> Result<&Vm> {
        self.vms
            .get(id.0 as usize)
            .ok_or(CloudyError::UnknownVm(id))
    }

    fn vm_mut(&mut self, id: VmId) -> Result<&mut Vm> {
        self.vms
            .get_mut(id.0 as usize)
            .ok_or(CloudyError::UnknownVm(id))
    }

    pub fn headroom(&self, id: VmId) -> Result<Resources> {
        Ok(self.vm(id)?.headroom())
    }

    pub fn allocated(&self, id: VmId) -> Result<Resources> {
        Ok(self.vm(id)?.allocated)
    }

    /// Headroom of every VM, indexed like [`ResourcePool::vms`].
    pub fn headrooms(&self) -> Vec<Resources> {
        self.vms.iter().map(Vm::headroom).collect()
    }

    pub fn total_capacity(&self) -> Resources {
        self.vms.iter().map(|vm| vm.capacity).sum()
    }

    pub fn total_allocated(&self) -> Resources {
        self.vms.iter().map(|vm| vm.allocated).sum()
    }

    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    /// Resources held by a live handle, or `None` once released.
    pub fn allocation(&self, handle: AllocationHandle) -> Option<Resources> {
        self.live.get(&handle.id).map(|a| a.resources)
    }

    /// Reserve `request` on `vm`.
    ///
    /// Either every dimension is reserved or nothing is; a request that does
    /// not fit fails with [`CloudyError::InsufficientResources`] and leaves
    /// the pool untouched.
    pub fn reserve(&mut self, vm: VmId, request: Resources) -> Result<AllocationHandle> {
        let target = self.vm_mut(vm)?;
        if !target.can_fit(&request) {
            return Err(CloudyError::InsufficientResources(format!(
                "{vm} cannot fit {request} (headroom {})",
                target.headroom()
            )));
        }
        target.allocated += request;

        let id = AllocationId(self.next_allocation);
        self.next_allocation += 1;
        self.live.insert(
            id,
            LiveAllocation {
                vm,
                resources: request,
            },
        );

        trace!(allocation = %id, %vm, %request, "reserved");
        Ok(AllocationHandle { id, vm })
    }

    /// Return a reservation to its VM.
    ///
    /// Releasing a handle that was already released is a caller error and
    /// yields [`CloudyError::DoubleRelease`]; the pool is not modified.
    pub fn release(&mut self, handle: AllocationHandle) -> Result<Resources> {
        let Some(live) = self.live.get(&handle.id).copied() else {
            if handle.id.0 < self.next_allocation {
                return Err(CloudyError::DoubleRelease(handle.id));
            }
            return Err(CloudyError::InvariantViolation(format!(
                "release of allocation {} that was never issued",
                handle.id
            )));
        };

        if live.vm != handle.vm {
            return Err(CloudyError::InvariantViolation(format!(
                "allocation {} belongs to {} but was released against {}",
                handle.id, live.vm, handle.vm
            )));
        }

        let vm = self.vm_mut(live.vm)?;
        vm.allocated = vm
            .allocated
            .checked_sub(&live.resources)
            .ok_or_else(|| {
                CloudyError::InvariantViolation(format!(
                    "{} allocated total underflows when releasing {}",
                    live.vm, handle.id
                ))
            })?;
        self.live.remove(&handle.id);

        debug!(allocation = %handle.id, vm = %live.vm, resources = %live.resources, "released");
        Ok(live.resources)
    }

    /// Verify allocated ≤ capacity on every VM and that each VM's allocated
    /// total equals the sum of its live reservations.
    pub fn check_invariants(&self) -> Result<()> {
        let mut per_vm = vec![Resources::ZERO; self.vms.len()];
        for live in self.live.values() {
            let slot = per_vm.get_mut(live.vm.0 as usize).ok_or_else(|| {
                CloudyError::InvariantViolation(format!(
                    "live allocation references unknown {}",
                    live.vm
                ))
            })?;
            *slot += live.resources;
        }

        for (vm, expected) in self.vms.iter().zip(per_vm) {
            if !vm.allocated.fits_within(&vm.capacity) {
                return Err(CloudyError::InvariantViolation(format!(
                    "{} over-allocated: {} of {}",
                    vm.id, vm.allocated, vm.capacity
                )));
            }
            if vm.allocated != expected {
                return Err(CloudyError::InvariantViolation(format!(
                    "{} allocated {} but live reservations sum to {}",
                    vm.id, vm.allocated, expected
                )));
            }
        }

        Ok(())
    }
}
