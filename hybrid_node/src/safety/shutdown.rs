//! Emergency shutdown causes.
//!
//! Executing the shutdown (stop, zero outputs, write the zero buffer) is
//! done by `HybridNode`; the monitor only decides that it must happen.

use hybrid_common::node::state::SafetyState;
use serde::{Deserialize, Serialize};

/// Why a run ended in emergency shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownCause {
    /// `emergency_shutdown()` called by the operator or a supervisor.
    Requested,
    /// Temperature above the critical threshold.
    ThermalCritical,
    /// Consecutive deadline misses reached the escalation limit.
    DeadlineEscalation,
}

impl ShutdownCause {
    /// Safety state the node is left in.
    #[inline]
    pub const fn safety_state(self) -> SafetyState {
        match self {
            Self::ThermalCritical => SafetyState::ThermalCritical,
            Self::Requested | Self::DeadlineEscalation => SafetyState::Fault,
        }
    }
}

impl std::fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::ThermalCritical => write!(f, "thermal critical"),
            Self::DeadlineEscalation => write!(f, "deadline escalation"),
        }
    }
}
