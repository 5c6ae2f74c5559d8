//! Multi-channel sensor front-end.
//!
//! Converts raw 12-bit codes of the auxiliary sensor ADC into
//! [`ChannelSample`]s: voltage against the 3.3 V reference, then a normalized
//! value in [0, 1] (range-calibrated when a [`SensorRange`] is installed),
//! then optional exponential smoothing.
//!
//! This is a standalone front-end for the slow sensor inputs. It is not
//! part of the [`HybridNode`](crate::node::HybridNode) cycle, which works
//! on interleaved `f32` buffers from the hardware port; an embedding
//! application owns a `SensorFrontEnd` and feeds it codes directly.

use hybrid_common::consts::{SENSOR_ADC_MAX, SENSOR_CHANNELS, SENSOR_SMOOTHING_ALPHA, SENSOR_VREF};
use hybrid_common::node::error::NodeError;
use hybrid_common::node::metrics::{ChannelSample, SensorFrame};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Per-channel voltage range measured by [`SensorFrontEnd::calibrate_range`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRange {
    pub v_min: [f32; SENSOR_CHANNELS],
    pub v_max: [f32; SENSOR_CHANNELS],
    /// `v_min / VREF`.
    pub offset: [f32; SENSOR_CHANNELS],
    /// `(v_max − v_min) / VREF`.
    pub scale: [f32; SENSOR_CHANNELS],
    /// Raw frames the range was measured over.
    pub samples: u32,
}

impl Default for SensorRange {
    fn default() -> Self {
        Self {
            v_min: [0.0; SENSOR_CHANNELS],
            v_max: [SENSOR_VREF; SENSOR_CHANNELS],
            offset: [0.0; SENSOR_CHANNELS],
            scale: [1.0; SENSOR_CHANNELS],
            samples: 0,
        }
    }
}

impl SensorRange {
    /// Map `voltage` of `channel` into [0, 1]. An empty or inverted range maps to 0.5.
    #[inline]
    pub fn normalize(&self, voltage: f32, channel: usize) -> f32 {
        let (lo, hi) = (self.v_min[channel], self.v_max[channel]);
        if hi <= lo {
            return 0.5;
        }
        ((voltage - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Front-end counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorStatistics {
    pub total_samples: u64,
    pub dropped_samples: u64,
    pub calibrated: bool,
}

/// Raw code → voltage.
#[inline]
pub fn code_to_voltage(raw: u16) -> f32 {
    raw.min(SENSOR_ADC_MAX) as f32 / SENSOR_ADC_MAX as f32 * SENSOR_VREF
}

/// Sensor conversion pipeline.
#[derive(Debug, Clone)]
pub struct SensorFrontEnd {
    channels: usize,
    smoothing: bool,
    smoothed: [f32; SENSOR_CHANNELS],
    range: Option<SensorRange>,
    stats: SensorStatistics,
}

impl SensorFrontEnd {
    /// Front-end for `channels` sensor inputs (1..=4).
    pub fn new(channels: usize, smoothing: bool) -> Result<Self, NodeError> {
        if channels == 0 || channels > SENSOR_CHANNELS {
            return Err(NodeError::InvalidArgument(format!(
                "sensor channels must be in 1..={SENSOR_CHANNELS}, got {channels}"
            )));
        }
        Ok(Self {
            channels,
            smoothing,
            smoothed: [0.0; SENSOR_CHANNELS],
            range: None,
            stats: SensorStatistics::default(),
        })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Convert one acquisition of every channel.
    ///
    /// A reading with the wrong number of codes is counted as dropped and
    /// rejected. Codes above full scale saturate.
    pub fn convert(&mut self, raw: &[u16], timestamp_us: u64) -> Result<SensorFrame, NodeError> {
        if raw.len() != self.channels {
            self.stats.dropped_samples += 1;
            return Err(NodeError::InvalidArgument(format!(
                "expected {} sensor codes, got {}",
                self.channels,
                raw.len()
            )));
        }

        let mut frame = SensorFrame::new();
        for (ch, &code) in raw.iter().enumerate() {
            let code = code.min(SENSOR_ADC_MAX);
            let voltage = code_to_voltage(code);
            let mut normalized = match &self.range {
                Some(range) => range.normalize(voltage, ch),
                None => voltage / SENSOR_VREF,
            };
            if self.smoothing {
                let s = &mut self.smoothed[ch];
                *s = SENSOR_SMOOTHING_ALPHA * normalized + (1.0 - SENSOR_SMOOTHING_ALPHA) * *s;
                normalized = *s;
            }
            // Capacity equals SENSOR_CHANNELS and channels is bounded by it.
            let _ = frame.push(ChannelSample {
                raw: code,
                voltage,
                normalized,
                timestamp_us,
            });
        }
        self.stats.total_samples += 1;
        Ok(frame)
    }

    /// Measure the per-channel voltage range over a batch of raw frames and
    /// install it.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty batch or a frame of the wrong width.
    pub fn calibrate_range(&mut self, frames: &[&[u16]]) -> Result<SensorRange, NodeError> {
        if frames.is_empty() {
            return Err(NodeError::InvalidArgument(
                "range calibration needs at least one frame".into(),
            ));
        }

        let mut range = SensorRange {
            v_min: [SENSOR_VREF; SENSOR_CHANNELS],
            v_max: [0.0; SENSOR_CHANNELS],
            ..Default::default()
        };
        for frame in frames {
            if frame.len() != self.channels {
                return Err(NodeError::InvalidArgument(format!(
                    "calibration frame has {} codes, expected {}",
                    frame.len(),
                    self.channels
                )));
            }
            for (ch, &code) in frame.iter().enumerate() {
                let v = code_to_voltage(code);
                range.v_min[ch] = range.v_min[ch].min(v);
                range.v_max[ch] = range.v_max[ch].max(v);
            }
        }
        for ch in 0..SENSOR_CHANNELS {
            if ch >= self.channels {
                range.v_min[ch] = 0.0;
                range.v_max[ch] = SENSOR_VREF;
            }
            range.offset[ch] = range.v_min[ch] / SENSOR_VREF;
            range.scale[ch] = (range.v_max[ch] - range.v_min[ch]) / SENSOR_VREF;
        }
        range.samples = frames.len() as u32;

        info!(
            "Sensor range calibrated over {} frames: min {:?} V, max {:?} V",
            range.samples,
            &range.v_min[..self.channels],
            &range.v_max[..self.channels]
        );
        self.load_range(range);
        Ok(range)
    }

    /// Install a previously measured range.
    pub fn load_range(&mut self, range: SensorRange) {
        self.range = Some(range);
        self.stats.calibrated = true;
    }

    #[inline]
    pub fn range(&self) -> Option<&SensorRange> {
        self.range.as_ref()
    }

    #[inline]
    pub fn statistics(&self) -> SensorStatistics {
        self.stats
    }

    /// Zero the sample counters. Calibration is kept.
    pub fn reset_statistics(&mut self) {
        self.stats.total_samples = 0;
        self.stats.dropped_samples = 0;
    }
}
