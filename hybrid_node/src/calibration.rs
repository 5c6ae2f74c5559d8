//! Offline calibration routine and the live profile slot.
//!
//! The routine runs only while the node is stopped:
//!
//! 1. Read `passes` quiet input buffers; per channel, offset = −(mean of the
//!    per-buffer means).
//! 2. Write an impulse, read it back, and time the round trip on the port
//!    clock; split the total into acquisition/analysis/actuation thirds.
//! 3. Stamp the profile and mark it valid.
//!
//! The latency budget is evaluated and reported but never fails the call.
//! The result is installed into a [`ProfileSlot`] as one whole value.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hybrid_common::consts::MAX_CHANNELS;
use hybrid_common::hal::{HardwarePort, PortLayout};
use hybrid_common::node::calibration::{CalibrationError, CalibrationProfile};
use hybrid_common::node::error::NodeError;
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ─── Profile Slot ───────────────────────────────────────────────────

/// Shared holder of the live calibration profile.
///
/// Installs replace the whole profile under the write lock; readers copy it
/// out under the read lock, so nobody observes a partial profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileSlot {
    inner: Arc<RwLock<CalibrationProfile>>,
}

impl ProfileSlot {
    pub fn new(profile: CalibrationProfile) -> Self {
        Self {
            inner: Arc::new(RwLock::new(profile)),
        }
    }

    /// Copy of the current profile. May wait for an in-progress install.
    pub fn snapshot(&self) -> CalibrationProfile {
        *self.inner.read()
    }

    /// Copy of the current profile, or `None` if an install holds the lock.
    #[inline]
    pub fn try_snapshot(&self) -> Option<CalibrationProfile> {
        self.inner.try_read().map(|p| *p)
    }

    /// Replace the profile.
    pub fn install(&self, profile: CalibrationProfile) {
        *self.inner.write() = profile;
    }

    /// Exclusive access to the profile. Cycles running meanwhile keep
    /// their last copy.
    pub fn write(&self) -> RwLockWriteGuard<'_, CalibrationProfile> {
        self.inner.write()
    }
}

// ─── Latency Budget ─────────────────────────────────────────────────

/// Whether a measured latency meets its budget (inclusive).
#[inline]
pub const fn evaluate_latency_budget(measured_us: u32, budget_us: u32) -> bool {
    measured_us <= budget_us
}

/// Measured round trip against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyReport {
    pub measured_us: u32,
    pub budget_us: u32,
    pub passed: bool,
}

impl LatencyReport {
    pub const fn new(measured_us: u32, budget_us: u32) -> Self {
        Self {
            measured_us,
            budget_us,
            passed: evaluate_latency_budget(measured_us, budget_us),
        }
    }
}

/// Result of one calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub profile: CalibrationProfile,
    pub latency: LatencyReport,
    pub passes: u32,
}

// ─── Routine ────────────────────────────────────────────────────────

/// Calibration routine parameters.
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
    layout: PortLayout,
    passes: u32,
    latency_budget_us: u32,
}

impl Calibrator {
    /// # Errors
    /// `InvalidArgument` unless `passes > 1` and the layout is non-empty.
    pub fn new(layout: PortLayout, passes: u32, latency_budget_us: u32) -> Result<Self, NodeError> {
        if passes < 2 {
            return Err(NodeError::InvalidArgument(format!(
                "calibration needs at least 2 passes, got {passes}"
            )));
        }
        if layout.buffer_size == 0 || layout.adc_channels == 0 || layout.dac_channels == 0 {
            return Err(NodeError::InvalidArgument(
                "calibration needs a non-empty port layout".into(),
            ));
        }
        Ok(Self {
            layout,
            passes,
            latency_budget_us,
        })
    }

    /// Measure a new profile through `port`.
    ///
    /// `previous` supplies the revision counter. Nothing is installed here.
    pub fn run<P: HardwarePort + ?Sized>(
        &self,
        port: &mut P,
        previous: &CalibrationProfile,
    ) -> Result<CalibrationReport, NodeError> {
        let layout = self.layout;
        let channels = layout.adc_channels.min(MAX_CHANNELS);
        let frames = layout.buffer_size;
        let mut input = vec![0.0f32; layout.input_len()];

        info!(
            "Calibration: {} passes of {} frames on {} channels",
            self.passes, frames, channels
        );

        // (a) Input offset
        let mut mean_sum = [0.0f64; MAX_CHANNELS];
        for pass in 0..self.passes {
            port.read(&mut input, frames)?;
            for ch in 0..channels {
                let sum: f64 = input
                    .iter()
                    .skip(ch)
                    .step_by(layout.adc_channels)
                    .take(frames)
                    .map(|&v| v as f64)
                    .sum();
                mean_sum[ch] += sum / frames as f64;
            }
            debug!("Calibration pass {} read", pass + 1);
        }

        let mut profile = CalibrationProfile::identity(layout.adc_channels, layout.dac_channels);
        for ch in 0..channels {
            let offset = -(mean_sum[ch] / self.passes as f64) as f32;
            if !offset.is_finite() {
                return Err(CalibrationError::Failed(format!(
                    "non-finite offset on input channel {ch}"
                ))
                .into());
            }
            profile.input_offset[ch] = offset;
        }

        // (b) Round-trip latency
        let mut impulse = vec![0.0f32; layout.output_len()];
        impulse[0] = 1.0;
        let t0 = port.timestamp_us();
        port.write(&impulse, frames)?;
        port.read(&mut input, frames)?;
        let t1 = port.timestamp_us();
        impulse.fill(0.0);
        port.write(&impulse, frames)?;

        let total = u32::try_from(t1.saturating_sub(t0)).unwrap_or(u32::MAX);
        profile.set_latency(total);

        let latency = LatencyReport::new(total, self.latency_budget_us);
        if latency.passed {
            info!(
                "Calibration latency {} µs within {} µs budget",
                total, self.latency_budget_us
            );
        } else {
            warn!(
                "Calibration latency {} µs exceeds {} µs budget",
                total, self.latency_budget_us
            );
        }

        // (c) Stamp
        profile.created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        profile.revision = previous.revision.wrapping_add(1);
        profile.is_valid = true;

        Ok(CalibrationReport {
            profile,
            latency,
            passes: self.passes,
        })
    }
}
