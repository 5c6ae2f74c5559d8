//! Actuation buffer assembly.
//!
//! DAC channel layout per frame:
//!
//! | Channel | Content |
//! |---------|---------|
//! | 0 .. min(adc, 2) | conditioned passthrough (zero when the mode mutes audio) |
//! | 2 | cv1, depth channel |
//! | 3 | cv2, rate channel |
//! | others | 0 |
//!
//! Every channel gets the profile's output gain/offset correction. Control
//! voltages are bounded afterwards: to `[voltage_min, voltage_max]` when
//! clamping is enabled, otherwise to the physical DAC rails. A non-finite
//! corrected value is written as the lower bound.

use hybrid_common::consts::{
    CV1_CHANNEL, CV2_CHANNEL, PASSTHROUGH_CHANNELS, VOLTAGE_RAIL_MAX, VOLTAGE_RAIL_MIN,
};
use hybrid_common::node::calibration::CalibrationProfile;
use hybrid_common::node::config::NodeConfig;
use hybrid_common::node::metrics::ActuationCommand;

/// Final bounds applied to corrected control voltages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageBounds {
    pub min: f32,
    pub max: f32,
}

impl VoltageBounds {
    pub const RAILS: Self = Self {
        min: VOLTAGE_RAIL_MIN,
        max: VOLTAGE_RAIL_MAX,
    };

    pub fn from_config(config: &NodeConfig) -> Self {
        if config.enable_voltage_clamp {
            Self {
                min: config.voltage_min,
                max: config.voltage_max,
            }
        } else {
            Self::RAILS
        }
    }

    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        if v.is_finite() {
            v.clamp(self.min, self.max)
        } else {
            self.min
        }
    }
}

/// Channel counts of the two interleaved buffers and the control-voltage
/// bounds of the DAC side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputLayout {
    pub adc_channels: usize,
    pub dac_channels: usize,
    pub bounds: VoltageBounds,
}

impl OutputLayout {
    #[inline]
    fn passthrough(&self) -> usize {
        self.adc_channels.min(PASSTHROUGH_CHANNELS).min(self.dac_channels)
    }
}

/// Fill `frames` rows of `output` from the conditioned input and `command`.
pub fn assemble(
    output: &mut [f32],
    conditioned: &[f32],
    frames: usize,
    layout: OutputLayout,
    pass_audio: bool,
    command: &ActuationCommand,
    profile: &CalibrationProfile,
) {
    let dac = layout.dac_channels;
    let adc = layout.adc_channels;
    let pass = layout.passthrough();
    let correct = |ch: usize, v: f32| v * profile.output_gain[ch] + profile.output_offset[ch];

    let bounds = layout.bounds;
    let cv1 = bounds.clamp(correct(CV1_CHANNEL.min(dac.saturating_sub(1)), command.cv1));
    let cv2 = bounds.clamp(correct(CV2_CHANNEL.min(dac.saturating_sub(1)), command.cv2));

    for (frame, row) in output[..frames * dac].chunks_exact_mut(dac).enumerate() {
        row.fill(0.0);
        if pass_audio {
            for ch in 0..pass {
                row[ch] = correct(ch, conditioned[frame * adc + ch]);
            }
        }
        if dac > CV1_CHANNEL {
            row[CV1_CHANNEL] = cv1;
        }
        if dac > CV2_CHANNEL {
            row[CV2_CHANNEL] = cv2;
        }
    }
}

/// Zero `frames` rows of `output`.
#[inline]
pub fn silence(output: &mut [f32], frames: usize, dac_channels: usize) {
    let n = (frames * dac_channels).min(output.len());
    output[..n].fill(0.0);
}
