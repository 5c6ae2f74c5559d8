//! Error types for the processing node.
//!
//! Non-real-time calls return [`NodeError`]. Anomalies inside the cycle are
//! never errors: they are recorded as [`SafetyFlags`] in the cycle outcome
//! and in safety telemetry.

use bitflags::bitflags;
use thiserror::Error;

use crate::config::ConfigError;
use crate::hal::HalError;
use crate::node::calibration::CalibrationError;

bitflags! {
    /// Per-cycle anomaly flags.
    ///
    /// CRITICAL flags (→ emergency shutdown): THERMAL_CRITICAL, SHUTDOWN.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SafetyFlags: u16 {
        /// Conditioned peak above the overload threshold.
        const OVERLOAD         = 0x0001;
        /// Temperature above the warning threshold.
        const THERMAL_WARNING  = 0x0002;
        /// Temperature above the critical threshold. **CRITICAL**.
        const THERMAL_CRITICAL = 0x0004;
        /// An actuation output reached its ceiling.
        const VOLTAGE_CLAMP    = 0x0008;
        /// Cycle exceeded one buffer duration.
        const DEADLINE_MISS    = 0x0010;
        /// Port read, write, gain or sensor access failed.
        const HARDWARE_FAULT   = 0x0020;
        /// Emergency shutdown executed this cycle. **CRITICAL**.
        const SHUTDOWN         = 0x0040;
    }
}

impl SafetyFlags {
    /// Mask of all CRITICAL flags.
    pub const CRITICAL_MASK: Self =
        Self::from_bits_truncate(Self::THERMAL_CRITICAL.bits() | Self::SHUTDOWN.bits());

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for SafetyFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Failure of a non-real-time node operation. No state is changed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// Absent or mis-sized buffer, out-of-range value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Hardware port failure during init, start or calibration.
    #[error("hardware fault: {0}")]
    Hardware(#[from] HalError),

    /// Calibration record or routine failure.
    #[error("calibration: {0}")]
    Calibration(#[from] CalibrationError),

    /// Configuration file failure.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}
