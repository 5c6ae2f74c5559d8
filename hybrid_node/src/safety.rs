//! Safety module root.
//!
//! Per-cycle interlock evaluation, deadline supervision, and the causes
//! that end a run in emergency shutdown.

pub mod deadline;
pub mod monitor;
pub mod shutdown;

pub use deadline::{DeadlineTracker, DeadlineVerdict};
pub use monitor::{SafetyInputs, SafetyMonitor, SafetyVerdict};
pub use shutdown::ShutdownCause;
