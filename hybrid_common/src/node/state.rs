//! State enums for the processing node.
//!
//! `#[repr(u8)]` so that states can be published in fixed-layout telemetry.

use serde::{Deserialize, Serialize};

// ─── Lifecycle ──────────────────────────────────────────────────────

/// Node lifecycle. Configuration and calibration are only legal in `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeLifecycle {
    /// Constructed, `init` not yet called (or it failed).
    Uninitialized = 0,
    /// Initialized and idle.
    Stopped = 1,
    /// Cycle running.
    Running = 2,
}

impl NodeLifecycle {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::Stopped),
            2 => Some(Self::Running),
            _ => None,
        }
    }
}

impl Default for NodeLifecycle {
    fn default() -> Self {
        Self::Uninitialized
    }
}

// ─── Safety ─────────────────────────────────────────────────────────

/// Safety interlock state.
///
/// `ThermalCritical` and `Fault` are terminal for the current run: they are
/// left only through `start()` (restart) or an explicit reset while stopped.
/// Every other state is re-evaluated each cycle.
///
/// Discriminants are not a severity order. Within one cycle the last
/// condition checked wins unless a terminal state was already entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SafetyState {
    Ok = 0,
    /// An actuation output reached its ceiling.
    VoltageClamp = 1,
    /// Temperature above the warning threshold.
    ThermalWarning = 2,
    /// Temperature above the critical threshold; node shut down.
    ThermalCritical = 3,
    /// Conditioned peak above the overload threshold.
    Overload = 4,
    /// Emergency shutdown executed.
    Fault = 5,
}

impl SafetyState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::VoltageClamp),
            2 => Some(Self::ThermalWarning),
            3 => Some(Self::ThermalCritical),
            4 => Some(Self::Overload),
            5 => Some(Self::Fault),
            _ => None,
        }
    }

    /// Whether leaving this state requires a restart or explicit reset.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ThermalCritical | Self::Fault)
    }

    /// Move to `next` unless this state is terminal.
    #[inline]
    pub const fn overwrite(self, next: Self) -> Self {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }
}

impl Default for SafetyState {
    fn default() -> Self {
        Self::Ok
    }
}
