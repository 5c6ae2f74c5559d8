//! Synchronization pulse and clock-drift measurement.
//!
//! The pulse is ticked from a higher-rate context than the processing
//! cycle, so its counter and edge level are atomics. The cycle only ever
//! reads them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Drift of an observed pulse count against the expected count [ppm].
///
/// Returns 0 when nothing was expected.
#[inline]
pub fn drift_ppm(observed: u64, expected: f64) -> f32 {
    if expected <= 0.0 {
        return 0.0;
    }
    ((observed as f64 - expected) / expected * 1_000_000.0) as f32
}

/// Periodic edge output shared between the pulse tick and the cycle.
#[derive(Debug)]
pub struct SyncPulse {
    count: AtomicU64,
    level: AtomicBool,
    enabled: AtomicBool,
}

impl SyncPulse {
    /// A disabled pulse at count 0, level low.
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            level: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
        }
    }

    /// One pulse period: toggle the edge and count it. No-op while disabled.
    #[inline]
    pub fn tick(&self) {
        if self.enabled.load(Ordering::Acquire) {
            self.level.fetch_xor(true, Ordering::AcqRel);
            self.count.fetch_add(1, Ordering::AcqRel);
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Current edge level.
    #[inline]
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Zero the counter and drop the edge low.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
        self.level.store(false, Ordering::Release);
    }
}

impl Default for SyncPulse {
    fn default() -> Self {
        Self::new()
    }
}

/// Windowed drift measurement over a pulse counter.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeter {
    pulse_hz: u32,
    window_us: u64,
    start_count: u64,
    start_us: u64,
    armed: bool,
    last_ppm: f32,
}

impl DriftMeter {
    pub const fn new(pulse_hz: u32, window_us: u64) -> Self {
        Self {
            pulse_hz,
            window_us,
            start_count: 0,
            start_us: 0,
            armed: false,
            last_ppm: 0.0,
        }
    }

    /// Start a window at `count` / `now_us`.
    pub fn begin(&mut self, count: u64, now_us: u64) {
        self.start_count = count;
        self.start_us = now_us;
        self.armed = true;
    }

    /// Feed the current count. Returns the drift once a window completes
    /// and starts the next one. The first call only arms the meter.
    pub fn sample(&mut self, count: u64, now_us: u64) -> Option<f32> {
        if !self.armed {
            self.begin(count, now_us);
            return None;
        }
        let elapsed_us = now_us.saturating_sub(self.start_us);
        if elapsed_us < self.window_us {
            return None;
        }
        let expected = elapsed_us as f64 * self.pulse_hz as f64 / 1_000_000.0;
        let observed = count.saturating_sub(self.start_count);
        self.last_ppm = drift_ppm(observed, expected);
        self.begin(count, now_us);
        Some(self.last_ppm)
    }

    /// Drift of the last completed window [ppm].
    #[inline]
    pub fn last_ppm(&self) -> f32 {
        self.last_ppm
    }
}
