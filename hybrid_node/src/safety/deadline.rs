//! Cycle deadline supervision.
//!
//! A cycle must finish within one buffer duration. Isolated misses are
//! recorded only; `limit` consecutive misses escalate to a safety fault.

/// Outcome of one deadline check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadlineVerdict {
    pub missed: bool,
    /// Consecutive misses reached the limit this cycle.
    pub escalate: bool,
}

/// Miss counters against a configurable escalation limit.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineTracker {
    limit: u32,
    misses: u64,
    consecutive: u32,
}

impl DeadlineTracker {
    pub const fn new(limit: u32) -> Self {
        Self {
            limit,
            misses: 0,
            consecutive: 0,
        }
    }

    /// Check one cycle of `elapsed_us` against `budget_us`.
    #[inline]
    pub fn record(&mut self, elapsed_us: u64, budget_us: u64) -> DeadlineVerdict {
        if elapsed_us <= budget_us {
            self.consecutive = 0;
            return DeadlineVerdict::default();
        }
        self.misses += 1;
        self.consecutive = self.consecutive.saturating_add(1);
        DeadlineVerdict {
            missed: true,
            escalate: self.limit > 0 && self.consecutive >= self.limit,
        }
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    #[inline]
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Forget the current streak, keep the total.
    #[inline]
    pub fn clear_streak(&mut self) {
        self.consecutive = 0;
    }

    pub fn reset(&mut self) {
        self.misses = 0;
        self.consecutive = 0;
    }
}
