//! Test-signal generator feeding the virtual ADC.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Waveform presented at the analog input, before the preamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalSource {
    Silence,
    Sine { amplitude: f32, frequency_hz: f32 },
    Dc { level: f32 },
    Square { amplitude: f32, frequency_hz: f32 },
}

impl Default for SignalSource {
    fn default() -> Self {
        Self::Sine {
            amplitude: 0.02,
            frequency_hz: 440.0,
        }
    }
}

impl SignalSource {
    /// Value at `phase` (cycles, in [0, 1)).
    #[inline]
    fn value(&self, phase: f64) -> f32 {
        match *self {
            Self::Silence => 0.0,
            Self::Dc { level } => level,
            Self::Sine { amplitude, .. } => amplitude * (TAU * phase).sin() as f32,
            Self::Square { amplitude, .. } => {
                if phase < 0.5 {
                    amplitude
                } else {
                    -amplitude
                }
            }
        }
    }

    #[inline]
    fn frequency_hz(&self) -> f32 {
        match *self {
            Self::Sine { frequency_hz, .. } | Self::Square { frequency_hz, .. } => frequency_hz,
            Self::Silence | Self::Dc { .. } => 0.0,
        }
    }
}

/// Phase-continuous generator. Samples are scaled by the preamp gain and
/// clipped to the converter's full scale.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    source: SignalSource,
    phase: f64,
    full_scale: f32,
}

impl SignalGenerator {
    pub fn new(source: SignalSource, full_scale: f32) -> Self {
        Self {
            source,
            phase: 0.0,
            full_scale,
        }
    }

    pub fn set_source(&mut self, source: SignalSource) {
        self.source = source;
        self.phase = 0.0;
    }

    #[inline]
    pub fn source(&self) -> SignalSource {
        self.source
    }

    /// Fill `frames` interleaved rows of `channels`, same value on every channel.
    pub fn fill(
        &mut self,
        buffer: &mut [f32],
        frames: usize,
        channels: usize,
        sample_rate: u32,
        gain: f32,
    ) {
        let step = if sample_rate > 0 {
            self.source.frequency_hz() as f64 / sample_rate as f64
        } else {
            0.0
        };
        for row in buffer.chunks_exact_mut(channels).take(frames) {
            let v = (self.source.value(self.phase) * gain).clamp(-self.full_scale, self.full_scale);
            row.fill(v);
            self.phase = (self.phase + step).fract();
        }
    }
}
