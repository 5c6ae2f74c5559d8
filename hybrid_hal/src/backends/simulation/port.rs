//! Simulated hardware port.

use super::clock::{ClockMode, VirtualClock};
use super::signal::{SignalGenerator, SignalSource};
use hybrid_common::consts::AMBIENT_TEMPERATURE;
use hybrid_common::hal::{HalError, HardwarePort, PortLayout};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Options of the `simulation` backend (`[backend.options]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Waveform at the analog input.
    #[serde(default)]
    pub signal: SignalSource,
    /// Converter full scale; generated samples are clipped to ±this.
    #[serde(default = "default_full_scale")]
    pub full_scale: f32,
    /// Initial sensor temperature [°C].
    #[serde(default = "default_temperature")]
    pub temperature_c: f32,
    /// Temperature change per sensor read [°C].
    #[serde(default)]
    pub temperature_ramp_c: f32,
    #[serde(default)]
    pub clock: ClockMode,
    /// Virtual time added per timestamp query [µs].
    #[serde(default)]
    pub clock_step_us: u64,
    /// Virtual time added per read [µs].
    #[serde(default = "default_transfer_latency")]
    pub read_latency_us: u64,
    /// Virtual time added per write [µs].
    #[serde(default = "default_transfer_latency")]
    pub write_latency_us: u64,
    /// Feed the last written output back as input instead of the signal.
    #[serde(default)]
    pub loopback: bool,
}

fn default_full_scale() -> f32 {
    1.0
}
fn default_temperature() -> f32 {
    AMBIENT_TEMPERATURE
}
fn default_transfer_latency() -> u64 {
    400
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            signal: SignalSource::default(),
            full_scale: default_full_scale(),
            temperature_c: default_temperature(),
            temperature_ramp_c: 0.0,
            clock: ClockMode::default(),
            clock_step_us: 0,
            read_latency_us: default_transfer_latency(),
            write_latency_us: default_transfer_latency(),
            loopback: false,
        }
    }
}

impl SimulationSettings {
    /// Parse from a backend options table.
    pub fn from_table(options: &toml::Table) -> Result<Self, HalError> {
        toml::Value::Table(options.clone())
            .try_into()
            .map_err(|e| HalError::InitFailed(format!("simulation options: {e}")))
    }
}

/// Port operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FailurePoint {
    Init = 0,
    Read = 1,
    Write = 2,
    Gain = 3,
    Temperature = 4,
}

const FAILURE_POINTS: usize = 5;

/// Software port implementing `HardwarePort`.
pub struct SimulatedPort {
    settings: SimulationSettings,
    layout: Option<PortLayout>,
    generator: SignalGenerator,
    clock: VirtualClock,
    /// Analog preamp gain applied to the generated signal.
    gain: f32,
    temperature_c: f32,
    /// Last written actuation buffer, source of loopback input.
    last_output: Vec<f32>,
    failures: [bool; FAILURE_POINTS],
    reads: u64,
    writes: u64,
}

impl SimulatedPort {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            generator: SignalGenerator::new(settings.signal, settings.full_scale),
            clock: VirtualClock::new(
                settings.clock,
                settings.clock_step_us,
                settings.read_latency_us,
                settings.write_latency_us,
            ),
            gain: 1.0,
            temperature_c: settings.temperature_c,
            layout: None,
            last_output: Vec::new(),
            failures: [false; FAILURE_POINTS],
            reads: 0,
            writes: 0,
            settings,
        }
    }

    /// Replace the input waveform.
    pub fn set_signal(&mut self, source: SignalSource) {
        self.generator.set_source(source);
    }

    pub fn set_temperature(&mut self, celsius: f32) {
        self.temperature_c = celsius;
    }

    pub fn set_loopback(&mut self, enabled: bool) {
        self.settings.loopback = enabled;
    }

    /// Make `point` fail (or succeed again) from the next call on.
    pub fn inject_failure(&mut self, point: FailurePoint, fail: bool) {
        self.failures[point as usize] = fail;
    }

    pub fn clock_mut(&mut self) -> &mut VirtualClock {
        &mut self.clock
    }

    /// Analog gain last applied via `set_input_gain`.
    #[inline]
    pub fn input_gain(&self) -> f32 {
        self.gain
    }

    /// Samples of the last write.
    #[inline]
    pub fn last_output(&self) -> &[f32] {
        &self.last_output
    }

    #[inline]
    pub fn reads(&self) -> u64 {
        self.reads
    }

    #[inline]
    pub fn writes(&self) -> u64 {
        self.writes
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.layout.is_some()
    }

    #[inline]
    fn failing(&self, point: FailurePoint) -> bool {
        self.failures[point as usize]
    }

    fn layout(&self) -> Option<PortLayout> {
        self.layout
    }
}

impl Default for SimulatedPort {
    fn default() -> Self {
        Self::new(SimulationSettings::default())
    }
}

impl HardwarePort for SimulatedPort {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn init(&mut self, layout: &PortLayout) -> Result<(), HalError> {
        if self.failing(FailurePoint::Init) {
            return Err(HalError::InitFailed("injected init failure".into()));
        }
        if layout.buffer_size == 0 || layout.adc_channels == 0 || layout.dac_channels == 0 {
            return Err(HalError::InitFailed(format!(
                "degenerate layout {}x{}/{}",
                layout.buffer_size, layout.adc_channels, layout.dac_channels
            )));
        }
        self.last_output = vec![0.0; layout.output_len()];
        self.layout = Some(*layout);
        info!(
            "Simulation port initialized: {} Hz, {} frames, {} in / {} out, clock {:?}",
            layout.sample_rate,
            layout.buffer_size,
            layout.adc_channels,
            layout.dac_channels,
            self.clock.mode()
        );
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        debug!(
            "Simulation port shutdown after {} reads / {} writes",
            self.reads, self.writes
        );
        self.layout = None;
        Ok(())
    }

    fn read(&mut self, buffer: &mut [f32], frames: usize) -> Result<(), HalError> {
        if self.failing(FailurePoint::Read) {
            return Err(HalError::ReadFailed("injected read failure".into()));
        }
        let layout = self
            .layout()
            .ok_or_else(|| HalError::ReadFailed("port not initialized".into()))?;
        let needed = frames * layout.adc_channels;
        if buffer.len() < needed {
            return Err(HalError::ReadFailed(format!(
                "buffer holds {} samples, {needed} needed",
                buffer.len()
            )));
        }

        if self.settings.loopback {
            let fs = self.settings.full_scale;
            for (frame, row) in buffer[..needed]
                .chunks_exact_mut(layout.adc_channels)
                .enumerate()
            {
                for (ch, sample) in row.iter_mut().enumerate() {
                    *sample = if ch < layout.dac_channels {
                        self.last_output
                            .get(frame * layout.dac_channels + ch)
                            .copied()
                            .unwrap_or(0.0)
                            .clamp(-fs, fs)
                    } else {
                        0.0
                    };
                }
            }
        } else {
            self.generator.fill(
                &mut buffer[..needed],
                frames,
                layout.adc_channels,
                layout.sample_rate,
                self.gain,
            );
        }

        self.clock.on_read();
        self.reads += 1;
        Ok(())
    }

    fn write(&mut self, buffer: &[f32], frames: usize) -> Result<(), HalError> {
        if self.failing(FailurePoint::Write) {
            return Err(HalError::WriteFailed("injected write failure".into()));
        }
        let layout = self
            .layout()
            .ok_or_else(|| HalError::WriteFailed("port not initialized".into()))?;
        let n = frames * layout.dac_channels;
        if buffer.len() < n || n > self.last_output.len() {
            return Err(HalError::WriteFailed(format!(
                "{frames} frames do not fit the output buffer"
            )));
        }
        self.last_output[..n].copy_from_slice(&buffer[..n]);
        self.last_output[n..].fill(0.0);

        self.clock.on_write();
        self.writes += 1;
        Ok(())
    }

    fn set_input_gain(&mut self, gain: f32) -> Result<(), HalError> {
        if self.failing(FailurePoint::Gain) {
            return Err(HalError::WriteFailed("injected preamp failure".into()));
        }
        self.gain = gain;
        Ok(())
    }

    fn read_temperature(&mut self, channel: u8) -> Result<f32, HalError> {
        if self.failing(FailurePoint::Temperature) || channel != 0 {
            return Err(HalError::SensorUnavailable(format!(
                "thermal channel {channel}"
            )));
        }
        let t = self.temperature_c;
        self.temperature_c += self.settings.temperature_ramp_c;
        Ok(t)
    }

    fn timestamp_us(&mut self) -> u64 {
        self.clock.query()
    }
}
