//! Control-loop modulator.
//!
//! ```text
//! cv1 (depth) = depth_setpoint · coherence · V_max · modulation_depth
//! cv2 (rate)  = min(1000 / max(ICI, 10), 1) · V_max · modulation_depth
//! ```
//!
//! With modulation disabled the operator's manual voltages are used. Either
//! way the result is clamped to `[V_min, V_max]` when clamping is enabled.

use hybrid_common::consts::ICI_RATE_FLOOR_MS;
use hybrid_common::node::config::NodeConfig;
use hybrid_common::node::metrics::{ActuationCommand, AnalysisFrame, ControlSetpoints};

/// Result of one modulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulation {
    pub command: ActuationCommand,
    /// An output reached or exceeded `V_max` before clamping.
    pub at_ceiling: bool,
    /// `(1 − |cv1 − depth·V_max| / V_max) · 100` [%].
    pub fidelity: f32,
}

/// Modulator parameters, copied from the node configuration.
#[derive(Debug, Clone, Copy)]
pub struct Modulator {
    enabled: bool,
    modulation_depth: f32,
    clamp_enabled: bool,
    voltage_min: f32,
    voltage_max: f32,
}

impl Modulator {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            enabled: config.enable_modulation,
            modulation_depth: config.modulation_depth,
            clamp_enabled: config.enable_voltage_clamp,
            voltage_min: config.voltage_min,
            voltage_max: config.voltage_max,
        }
    }

    /// Closed-loop command from this cycle's analysis.
    pub fn modulate(&self, analysis: &AnalysisFrame, setpoints: &ControlSetpoints) -> Modulation {
        if !self.enabled {
            return self.manual(setpoints);
        }
        let scale = self.voltage_max * self.modulation_depth;
        let cv1 = setpoints.depth * analysis.coherence * scale;
        let rate = (1000.0 / analysis.ici_ms.max(ICI_RATE_FLOOR_MS)).min(1.0);
        let cv2 = rate * scale;
        self.finish(cv1, cv2, setpoints)
    }

    /// Open-loop command from the manual voltages.
    pub fn manual(&self, setpoints: &ControlSetpoints) -> Modulation {
        self.finish(setpoints.cv1, setpoints.cv2, setpoints)
    }

    /// Clamp an operator voltage the way outputs are clamped.
    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        if self.clamp_enabled {
            v.clamp(self.voltage_min, self.voltage_max)
        } else {
            v
        }
    }

    fn finish(&self, cv1: f32, cv2: f32, setpoints: &ControlSetpoints) -> Modulation {
        let at_ceiling = cv1 >= self.voltage_max || cv2 >= self.voltage_max;
        let command = ActuationCommand {
            cv1: self.clamp(cv1),
            cv2: self.clamp(cv2),
            phase: setpoints.phase,
            depth: setpoints.depth,
        };
        Modulation {
            fidelity: self.fidelity(command.cv1, setpoints.depth),
            command,
            at_ceiling,
        }
    }

    fn fidelity(&self, cv1: f32, depth: f32) -> f32 {
        if self.voltage_max <= 0.0 {
            return 0.0;
        }
        let target = depth * self.voltage_max;
        (1.0 - (cv1 - target).abs() / self.voltage_max) * 100.0
    }
}
