//! Safety monitor state machine.
//!
//! Evaluated once per cycle, in this order:
//!
//! 1. Overload: count it, request a 10 % gain reduction while the gain is
//!    above its floor → `Overload`.
//! 2. Temperature above critical → emergency shutdown, `ThermalCritical`.
//! 3. Else temperature above warning → `ThermalWarning`, sticky advisory.
//! 4. An actuation output at its ceiling: count it → `VoltageClamp`.
//! 5. Deadline escalation → emergency shutdown, `Fault`.
//! 6. Otherwise `Ok`.
//!
//! Each step that fires overwrites the state set by the previous ones, so
//! a clamp coinciding with an overload reports `VoltageClamp`. Once
//! `ThermalCritical` or `Fault` is entered, later steps only add flags.
//! Terminal states are kept by further evaluations until
//! [`SafetyMonitor::restart`] or [`SafetyMonitor::reset`].

use hybrid_common::node::config::NodeConfig;
use hybrid_common::node::error::SafetyFlags;
use hybrid_common::node::metrics::SafetyTelemetry;
use hybrid_common::node::state::SafetyState;
use tracing::{info, warn};

use super::deadline::{DeadlineTracker, DeadlineVerdict};
use super::shutdown::ShutdownCause;

/// Observations of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SafetyInputs {
    /// Conditioned peak above the overload threshold.
    pub overloaded: bool,
    /// Whether the preamp can still be reduced.
    pub gain_above_floor: bool,
    /// This cycle's temperature reading, if one was taken.
    pub temperature_c: Option<f32>,
    /// An actuation output reached its ceiling.
    pub at_ceiling: bool,
    pub deadline: DeadlineVerdict,
    /// A port access failed during the cycle.
    pub hardware_fault: bool,
}

/// Decision of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyVerdict {
    pub state: SafetyState,
    pub flags: SafetyFlags,
    /// Multiply the preamp gain by the reduction factor.
    pub reduce_gain: bool,
    /// Emergency shutdown must be executed before the cycle returns.
    pub shutdown: Option<ShutdownCause>,
}

/// Interlock state machine and its telemetry.
#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    thermal_enabled: bool,
    thermal_warning_c: f32,
    thermal_critical_c: f32,
    deadline: DeadlineTracker,
    telemetry: SafetyTelemetry,
}

impl SafetyMonitor {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            thermal_enabled: config.enable_thermal_monitor,
            thermal_warning_c: config.thermal_warning_c,
            thermal_critical_c: config.thermal_critical_c,
            deadline: DeadlineTracker::new(config.deadline_escalation_limit),
            telemetry: SafetyTelemetry::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> SafetyState {
        self.telemetry.state
    }

    #[inline]
    pub fn telemetry(&self) -> &SafetyTelemetry {
        &self.telemetry
    }

    #[inline]
    pub fn thermal_enabled(&self) -> bool {
        self.thermal_enabled
    }

    /// Check the cycle duration against its budget.
    #[inline]
    pub fn check_deadline(&mut self, elapsed_us: u64, budget_us: u64) -> DeadlineVerdict {
        self.deadline.record(elapsed_us, budget_us)
    }

    /// Evaluate one cycle and update telemetry.
    pub fn evaluate(&mut self, inputs: &SafetyInputs) -> SafetyVerdict {
        let mut flags = SafetyFlags::empty();
        let mut state = SafetyState::Ok;
        let mut reduce_gain = false;
        let mut shutdown = None;

        // 1. Overload
        if inputs.overloaded {
            flags |= SafetyFlags::OVERLOAD;
            self.telemetry.overload_count += 1;
            reduce_gain = inputs.gain_above_floor;
            state = state.overwrite(SafetyState::Overload);
        }

        // 2./3. Thermal
        if let Some(t) = inputs.temperature_c {
            self.telemetry.temperature_c = t;
            if t > self.thermal_critical_c {
                flags |= SafetyFlags::THERMAL_CRITICAL;
                shutdown = Some(ShutdownCause::ThermalCritical);
                state = state.overwrite(SafetyState::ThermalCritical);
            } else if t > self.thermal_warning_c {
                flags |= SafetyFlags::THERMAL_WARNING;
                self.telemetry.thermal_warning = true;
                state = state.overwrite(SafetyState::ThermalWarning);
            }
        }

        // 4. Clamp
        if inputs.at_ceiling {
            flags |= SafetyFlags::VOLTAGE_CLAMP;
            self.telemetry.clamp_count += 1;
            state = state.overwrite(SafetyState::VoltageClamp);
        }

        // 5. Deadline
        if inputs.deadline.missed {
            flags |= SafetyFlags::DEADLINE_MISS;
            if inputs.deadline.escalate && shutdown.is_none() {
                shutdown = Some(ShutdownCause::DeadlineEscalation);
                state = state.overwrite(SafetyState::Fault);
            }
        }

        if inputs.hardware_fault {
            flags |= SafetyFlags::HARDWARE_FAULT;
        }
        if shutdown.is_some() {
            flags |= SafetyFlags::SHUTDOWN;
        }

        if self.telemetry.state.is_terminal() {
            state = self.telemetry.state;
        }
        self.transition(state);

        self.telemetry.flags = flags.bits();
        self.telemetry.sticky_flags |= flags.bits();
        self.telemetry.deadline_misses = self.deadline.misses();
        self.telemetry.consecutive_deadline_misses = self.deadline.consecutive();

        SafetyVerdict {
            state: self.telemetry.state,
            flags,
            reduce_gain,
            shutdown,
        }
    }

    /// Record an executed emergency shutdown.
    pub fn enter_shutdown(&mut self, cause: ShutdownCause) {
        self.telemetry.flags |= SafetyFlags::SHUTDOWN.bits();
        self.telemetry.sticky_flags |= SafetyFlags::SHUTDOWN.bits();
        self.transition(cause.safety_state());
    }

    /// Record a port failure observed outside [`SafetyMonitor::evaluate`].
    pub fn note_hardware_fault(&mut self) {
        self.telemetry.flags |= SafetyFlags::HARDWARE_FAULT.bits();
        self.telemetry.sticky_flags |= SafetyFlags::HARDWARE_FAULT.bits();
    }

    /// Leave a terminal state at the start of a new run. Counters survive.
    pub fn restart(&mut self) {
        self.deadline.clear_streak();
        self.telemetry.consecutive_deadline_misses = 0;
        self.telemetry.flags = 0;
        if self.telemetry.state.is_terminal() {
            info!("Safety: {:?} cleared by restart", self.telemetry.state);
            self.telemetry.state = SafetyState::Ok;
        }
    }

    /// Operator reset of counters, sticky flags and the advisory latch.
    ///
    /// A terminal state is only cleared when `clear_terminal` is set.
    pub fn reset(&mut self, clear_terminal: bool) {
        let keep = if self.telemetry.state.is_terminal() && !clear_terminal {
            self.telemetry.state
        } else {
            SafetyState::Ok
        };
        let temperature_c = self.telemetry.temperature_c;
        self.deadline.reset();
        self.telemetry = SafetyTelemetry {
            state: keep,
            temperature_c,
            ..Default::default()
        };
        info!("Safety telemetry reset (state {:?})", keep);
    }

    fn transition(&mut self, next: SafetyState) {
        let prev = self.telemetry.state;
        if prev == next {
            return;
        }
        if next != SafetyState::Ok {
            warn!("Safety state {:?} → {:?}", prev, next);
        } else {
            info!("Safety state {:?} → {:?}", prev, next);
        }
        self.telemetry.state = next;
    }
}
