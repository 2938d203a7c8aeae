// src/pool/vm.rs

use serde::Serialize;

use crate::types::{Resources, VmId};

/// A virtual machine: fixed capacity plus the sum of its live reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vm {
    pub id: VmId,
    pub capacity: Resources,
    pub allocated: Resources,
}

impl Vm {
    pub fn new(id: VmId, capacity: Resources) -> Self {
        Self {
            id,
            capacity,
            allocated: Resources::ZERO,
        }
    }

    /// Capacity not currently reserved.
    pub fn headroom(&self) -> Resources {
        self.capacity.saturating_sub(&self.allocated)
    }

    pub fn can_fit(&self, request: &Resources) -> bool {
        request.fits_within(&self.headroom())
    }

    pub fn is_idle(&self) -> bool {
        self.allocated.is_zero()
    }
}
