//! Common re-exports.
//!
//! ```rust
//! use hybrid_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};
pub use crate::node::config::{NodeConfig, OperatingMode};

// ─── State & Telemetry ──────────────────────────────────────────────
pub use crate::node::error::{NodeError, SafetyFlags};
pub use crate::node::metrics::{
    ActuationCommand, AnalogMetrics, AnalysisFrame, ChannelSample, ControlSetpoints,
    NodeStatus, RuntimeStatistics, SafetyTelemetry, SensorFrame,
};
pub use crate::node::state::{NodeLifecycle, SafetyState};

// ─── Calibration ────────────────────────────────────────────────────
pub use crate::node::calibration::{CalibrationError, CalibrationProfile};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::{HalError, HardwarePort, PortLayout, TransportPort};

// ─── Transport ──────────────────────────────────────────────────────
pub use crate::transport::{
    AuxMetric, DecodedMetrics, DriftMeter, SyncPulse, TransportError, TransportFrame,
    TransportMetrics,
};
