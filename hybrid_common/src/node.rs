//! Node-level shared types.
//!
//! - [`config`] - `NodeConfig` and `OperatingMode`
//! - [`state`] - lifecycle and safety state enums
//! - [`metrics`] - metric, telemetry and status records
//! - [`calibration`] - calibration profile and its binary record
//! - [`error`] - `NodeError` and per-cycle `SafetyFlags`

pub mod calibration;
pub mod config;
pub mod error;
pub mod metrics;
pub mod state;
