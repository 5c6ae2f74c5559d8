//! Port clock of the simulation backend.

use hybrid_common::hal::monotonic_us;
use serde::{Deserialize, Serialize};

/// Source of the port's timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Deterministic virtual time, advanced only by port activity.
    #[default]
    Virtual,
    /// Host monotonic clock; configured latencies are ignored.
    System,
}

/// Virtual microsecond clock.
///
/// Every timestamp query advances time by `step_us`; every transfer advances
/// it by the configured read/write latency. A write followed by a read thus
/// spans `write_latency_us + read_latency_us` plus one step per query.
#[derive(Debug, Clone, Copy)]
pub struct VirtualClock {
    mode: ClockMode,
    now_us: u64,
    step_us: u64,
    read_latency_us: u64,
    write_latency_us: u64,
}

impl VirtualClock {
    pub const fn new(mode: ClockMode, step_us: u64, read_latency_us: u64, write_latency_us: u64) -> Self {
        Self {
            mode,
            now_us: 0,
            step_us,
            read_latency_us,
            write_latency_us,
        }
    }

    /// Timestamp of this query [µs].
    pub fn query(&mut self) -> u64 {
        match self.mode {
            ClockMode::System => monotonic_us(),
            ClockMode::Virtual => {
                let t = self.now_us;
                self.now_us = self.now_us.saturating_add(self.step_us);
                t
            }
        }
    }

    #[inline]
    pub fn on_read(&mut self) {
        self.advance(self.read_latency_us);
    }

    #[inline]
    pub fn on_write(&mut self) {
        self.advance(self.write_latency_us);
    }

    /// Move virtual time forward. No effect in `System` mode.
    pub fn advance(&mut self, us: u64) {
        if self.mode == ClockMode::Virtual {
            self.now_us = self.now_us.saturating_add(us);
        }
    }

    pub fn set_step(&mut self, step_us: u64) {
        self.step_us = step_us;
    }

    pub fn set_latency(&mut self, read_us: u64, write_us: u64) {
        self.read_latency_us = read_us;
        self.write_latency_us = write_us;
    }

    #[inline]
    pub fn mode(&self) -> ClockMode {
        self.mode
    }
}
