//! Per-channel signal conditioner.
//!
//! Per sample: calibration offset → calibration gain → high-pass → low-pass.
//! Level metrics (RMS, peak, DC offset, overload) are accumulated over all
//! channels of the cycle. The filter state of every channel persists across
//! cycles and is only cleared by [`SignalConditioner::reset`].

use hybrid_common::consts::MAX_CHANNELS;
use hybrid_common::node::calibration::CalibrationProfile;
use hybrid_common::node::config::NodeConfig;
use hybrid_common::node::metrics::AnalogMetrics;

use super::filters::{ChannelFilter, FilterCoeffs};

/// Conditioner with pre-allocated per-channel filter state.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    channels: usize,
    filters: [ChannelFilter; MAX_CHANNELS],
    coeffs: FilterCoeffs,
    filter_enabled: bool,
    overload_threshold: f32,
}

impl SignalConditioner {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            channels: config.adc_channels.min(MAX_CHANNELS),
            filters: [ChannelFilter::default(); MAX_CHANNELS],
            coeffs: FilterCoeffs::new(
                config.hpf_cutoff,
                config.lpf_cutoff,
                config.sample_rate as f32,
            ),
            filter_enabled: config.enable_analog_filter,
            overload_threshold: config.overload_threshold,
        }
    }

    /// Clear the filter state of every channel.
    pub fn reset(&mut self) {
        for f in self.filters.iter_mut() {
            f.reset();
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Condition `frames` interleaved rows of `input` into `output`.
    ///
    /// Both slices must hold at least `frames × channels` samples; the node
    /// checks this before the cycle starts. No allocation.
    pub fn condition(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
        profile: &CalibrationProfile,
    ) -> AnalogMetrics {
        let n = frames * self.channels;
        if n == 0 {
            return AnalogMetrics::default();
        }

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut peak = 0.0f32;

        for (row_in, row_out) in input[..n]
            .chunks_exact(self.channels)
            .zip(output[..n].chunks_exact_mut(self.channels))
        {
            for ch in 0..self.channels {
                let mut v = (row_in[ch] + profile.input_offset[ch]) * profile.input_gain[ch];
                if self.filter_enabled {
                    v = self.filters[ch].apply(&self.coeffs, v);
                }
                row_out[ch] = v;

                sum += v as f64;
                sum_sq += (v as f64) * (v as f64);
                let a = v.abs();
                if a > peak {
                    peak = a;
                }
            }
        }

        let count = n as f64;
        AnalogMetrics {
            rms: (sum_sq / count).sqrt() as f32,
            peak,
            dc_offset: (sum / count) as f32,
            is_overloaded: peak > self.overload_threshold,
        }
    }
}
