//! O(1) per-cycle timing statistics.

/// Cycle timing accumulator. Updated every cycle with no allocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleStats {
    /// Total cycles recorded.
    pub cycle_count: u64,
    /// Last cycle duration [µs].
    pub last_cycle_us: u64,
    /// Minimum cycle duration [µs].
    pub min_cycle_us: u64,
    /// Maximum cycle duration [µs].
    pub max_cycle_us: u64,
    /// Running sum for the average.
    pub sum_cycle_us: u64,
    /// Running sum of squares for the standard deviation.
    pub sum_sq_cycle_us: u128,
    /// Cycles longer than their budget.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_us: 0,
            min_cycle_us: u64::MAX,
            max_cycle_us: 0,
            sum_cycle_us: 0,
            sum_sq_cycle_us: 0,
            overruns: 0,
        }
    }

    /// Record one cycle of `duration_us` against `budget_us`.
    #[inline]
    pub fn record(&mut self, duration_us: u64, budget_us: u64) {
        self.cycle_count += 1;
        self.last_cycle_us = duration_us;
        if duration_us < self.min_cycle_us {
            self.min_cycle_us = duration_us;
        }
        if duration_us > self.max_cycle_us {
            self.max_cycle_us = duration_us;
        }
        self.sum_cycle_us = self.sum_cycle_us.saturating_add(duration_us);
        self.sum_sq_cycle_us = self
            .sum_sq_cycle_us
            .saturating_add(duration_us as u128 * duration_us as u128);
        if duration_us > budget_us {
            self.overruns += 1;
        }
    }

    /// Average cycle time [µs] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_us(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_us / self.cycle_count
        }
    }

    /// Population standard deviation of the cycle time [µs].
    pub fn stddev_cycle_us(&self) -> f64 {
        if self.cycle_count == 0 {
            return 0.0;
        }
        let n = self.cycle_count as f64;
        let mean = self.sum_cycle_us as f64 / n;
        let var = self.sum_sq_cycle_us as f64 / n - mean * mean;
        var.max(0.0).sqrt()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Cycle time relative to its budget [%].
#[inline]
pub fn cpu_load_percent(duration_us: u64, budget_us: f64) -> f32 {
    if budget_us <= 0.0 {
        return 0.0;
    }
    (duration_us as f64 / budget_us * 100.0) as f32
}
