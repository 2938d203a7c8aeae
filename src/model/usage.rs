// src/model/usage.rs

//! How much of its allocation an instance actually uses.

use crate::types::Resources;

/// Share of an allocation in use, per dimension, as a `(start, end)` range
/// that an instance sweeps from 0% to 100% progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsagePattern {
    pub cpu: (f64, f64),
    pub memory: (f64, f64),
    pub gpu: (f64, f64),
    pub disk: (f64, f64),
}

impl UsagePattern {
    /// Used for task kinds no profile knows about.
    pub const DEFAULT: UsagePattern = UsagePattern {
        cpu: (0.5, 0.8),
        memory: (0.5, 0.8),
        gpu: (0.5, 0.8),
        disk: (0.5, 0.8),
    };

    fn ranges(&self) -> [(f64, f64); 4] {
        [self.cpu, self.memory, self.gpu, self.disk]
    }

    /// Usage of `allocation` at `progress` (clamped to [0, 1]).
    pub fn at(&self, allocation: Resources, progress: f64) -> Resources {
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.scale(allocation, |(lo, hi)| lo + (hi - lo) * progress)
    }

    /// Usage an instance settles at once it stops: the middle of each range.
    pub fn settled(&self, allocation: Resources) -> Resources {
        self.scale(allocation, |(lo, hi)| (lo + hi) / 2.0)
    }

    fn scale(&self, allocation: Resources, share: impl Fn((f64, f64)) -> f64) -> Resources {
        let dims = allocation.dimensions();
        let mut out = [0u64; 4];
        for (d, range) in self.ranges().into_iter().enumerate() {
            let share = share(range).clamp(0.0, 1.0);
            // Never above the allocation itself.
            out[d] = ((dims[d] as f64 * share).round() as u64).min(dims[d]);
        }
        Resources::from_dimensions(out)
    }
}
