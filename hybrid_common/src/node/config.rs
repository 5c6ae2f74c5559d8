//! Node configuration and operating modes.
//!
//! All fields carry a serde default so a partial `[node]` table is valid.
//! Numeric parameters are bounded by the `MIN`/`MAX` constants in
//! [`crate::consts`] and checked by [`NodeConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::hal::PortLayout;

/// Operating mode selected at init; changeable only while stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperatingMode {
    /// Conditioned passthrough only; analysis and modulation bypassed.
    AnalogOnly = 0,
    /// Analysis and actuation run, passthrough channels are muted.
    DspOnly = 1,
    /// Full pipeline.
    Hybrid = 2,
    /// Cycle refused; only the calibration routine may drive the port.
    Calibration = 3,
}

impl OperatingMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AnalogOnly),
            1 => Some(Self::DspOnly),
            2 => Some(Self::Hybrid),
            3 => Some(Self::Calibration),
            _ => None,
        }
    }

    /// Whether the analyzer and modulator run in this mode.
    #[inline]
    pub const fn runs_analysis(self) -> bool {
        matches!(self, Self::DspOnly | Self::Hybrid)
    }

    /// Whether conditioned input is copied to the passthrough outputs.
    #[inline]
    pub const fn passes_audio(self) -> bool {
        matches!(self, Self::AnalogOnly | Self::Hybrid)
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::Hybrid
    }
}

/// Complete configuration of one processing node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Sample rate [Hz]; sets the cycle cadence.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Frames per cycle.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Interleaved input channels.
    #[serde(default = "default_adc_channels")]
    pub adc_channels: usize,
    /// Interleaved output channels.
    #[serde(default = "default_dac_channels")]
    pub dac_channels: usize,

    /// Analog preamp gain (linear), bounded by `gain_min..=gain_max`.
    #[serde(default = "default_preamp_gain")]
    pub preamp_gain: f32,
    #[serde(default = "default_gain_min")]
    pub gain_min: f32,
    #[serde(default = "default_gain_max")]
    pub gain_max: f32,

    /// High-pass pole [Hz].
    #[serde(default = "default_hpf_cutoff")]
    pub hpf_cutoff: f32,
    /// Low-pass pole [Hz].
    #[serde(default = "default_lpf_cutoff")]
    pub lpf_cutoff: f32,
    #[serde(default = "default_true")]
    pub enable_analog_filter: bool,
    /// Overload threshold as a fraction of full scale.
    #[serde(default = "default_overload_threshold")]
    pub overload_threshold: f32,

    /// Spectral window length [samples], power of two.
    #[serde(default = "default_analysis_size")]
    pub analysis_size: usize,
    #[serde(default = "default_true")]
    pub enable_dsp: bool,
    #[serde(default = "default_true")]
    pub enable_coherence: bool,
    #[serde(default = "default_true")]
    pub enable_ici: bool,
    /// Flux that maps to zero coherence [Hz].
    #[serde(default = "default_flux_normalizer")]
    pub flux_normalizer: f32,
    /// Flux above which a ring entry is a peak.
    #[serde(default = "default_ici_peak_threshold")]
    pub ici_peak_threshold: f32,
    /// ICI reported with fewer than two peaks [ms].
    #[serde(default = "default_ici_default_ms")]
    pub ici_default_ms: f32,

    #[serde(default = "default_true")]
    pub enable_modulation: bool,
    /// Scaling of both actuation channels [0, 1].
    #[serde(default = "default_modulation_depth")]
    pub modulation_depth: f32,
    /// Control loop rate [Hz]. Reported only.
    #[serde(default = "default_control_loop_rate")]
    pub control_loop_rate: f32,

    #[serde(default = "default_true")]
    pub enable_voltage_clamp: bool,
    /// Actuation floor [V].
    #[serde(default = "default_voltage_min")]
    pub voltage_min: f32,
    /// Actuation ceiling [V].
    #[serde(default = "default_voltage_max")]
    pub voltage_max: f32,

    #[serde(default)]
    pub enable_thermal_monitor: bool,
    /// Port sensor channel read by the thermal monitor.
    #[serde(default)]
    pub thermal_sensor_channel: u8,
    #[serde(default = "default_thermal_warning")]
    pub thermal_warning_c: f32,
    #[serde(default = "default_thermal_critical")]
    pub thermal_critical_c: f32,

    /// Consecutive deadline misses escalated to Fault.
    #[serde(default = "default_deadline_escalation")]
    pub deadline_escalation_limit: u32,
    /// Round-trip latency budget evaluated by calibration [µs].
    #[serde(default = "default_latency_budget")]
    pub latency_budget_us: u32,
    /// Quiet buffers averaged per channel during calibration.
    #[serde(default = "default_calibration_passes")]
    pub calibration_passes: u32,

    #[serde(default)]
    pub mode: OperatingMode,
    #[serde(default = "default_true")]
    pub enable_logging: bool,
}

fn default_true() -> bool {
    true
}
fn default_sample_rate() -> u32 {
    SAMPLE_RATE_DEFAULT
}
fn default_buffer_size() -> usize {
    BUFFER_SIZE_DEFAULT
}
fn default_adc_channels() -> usize {
    ADC_CHANNELS_DEFAULT
}
fn default_dac_channels() -> usize {
    DAC_CHANNELS_DEFAULT
}
fn default_preamp_gain() -> f32 {
    PREAMP_GAIN_DEFAULT
}
fn default_gain_min() -> f32 {
    GAIN_MIN_DEFAULT
}
fn default_gain_max() -> f32 {
    GAIN_MAX_DEFAULT
}
fn default_hpf_cutoff() -> f32 {
    HPF_CUTOFF_DEFAULT
}
fn default_lpf_cutoff() -> f32 {
    LPF_CUTOFF_DEFAULT
}
fn default_overload_threshold() -> f32 {
    OVERLOAD_THRESHOLD_DEFAULT
}
fn default_analysis_size() -> usize {
    ANALYSIS_SIZE_DEFAULT
}
fn default_flux_normalizer() -> f32 {
    FLUX_NORMALIZER_DEFAULT
}
fn default_ici_peak_threshold() -> f32 {
    ICI_PEAK_THRESHOLD_DEFAULT
}
fn default_ici_default_ms() -> f32 {
    ICI_DEFAULT_MS
}
fn default_modulation_depth() -> f32 {
    MODULATION_DEPTH_DEFAULT
}
fn default_control_loop_rate() -> f32 {
    CONTROL_LOOP_RATE_DEFAULT
}
fn default_voltage_min() -> f32 {
    VOLTAGE_MIN_DEFAULT
}
fn default_voltage_max() -> f32 {
    VOLTAGE_MAX_DEFAULT
}
fn default_thermal_warning() -> f32 {
    THERMAL_WARNING_DEFAULT
}
fn default_thermal_critical() -> f32 {
    THERMAL_CRITICAL_DEFAULT
}
fn default_deadline_escalation() -> u32 {
    DEADLINE_ESCALATION_DEFAULT
}
fn default_latency_budget() -> u32 {
    LATENCY_BUDGET_US_DEFAULT
}
fn default_calibration_passes() -> u32 {
    CALIBRATION_PASSES_DEFAULT
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE_DEFAULT,
            buffer_size: BUFFER_SIZE_DEFAULT,
            adc_channels: ADC_CHANNELS_DEFAULT,
            dac_channels: DAC_CHANNELS_DEFAULT,
            preamp_gain: PREAMP_GAIN_DEFAULT,
            gain_min: GAIN_MIN_DEFAULT,
            gain_max: GAIN_MAX_DEFAULT,
            hpf_cutoff: HPF_CUTOFF_DEFAULT,
            lpf_cutoff: LPF_CUTOFF_DEFAULT,
            enable_analog_filter: true,
            overload_threshold: OVERLOAD_THRESHOLD_DEFAULT,
            analysis_size: ANALYSIS_SIZE_DEFAULT,
            enable_dsp: true,
            enable_coherence: true,
            enable_ici: true,
            flux_normalizer: FLUX_NORMALIZER_DEFAULT,
            ici_peak_threshold: ICI_PEAK_THRESHOLD_DEFAULT,
            ici_default_ms: ICI_DEFAULT_MS,
            enable_modulation: true,
            modulation_depth: MODULATION_DEPTH_DEFAULT,
            control_loop_rate: CONTROL_LOOP_RATE_DEFAULT,
            enable_voltage_clamp: true,
            voltage_min: VOLTAGE_MIN_DEFAULT,
            voltage_max: VOLTAGE_MAX_DEFAULT,
            enable_thermal_monitor: false,
            thermal_sensor_channel: 0,
            thermal_warning_c: THERMAL_WARNING_DEFAULT,
            thermal_critical_c: THERMAL_CRITICAL_DEFAULT,
            deadline_escalation_limit: DEADLINE_ESCALATION_DEFAULT,
            latency_budget_us: LATENCY_BUDGET_US_DEFAULT,
            calibration_passes: CALIBRATION_PASSES_DEFAULT,
            mode: OperatingMode::default(),
            enable_logging: true,
        }
    }
}

impl NodeConfig {
    /// Validate parameter bounds and cross-field consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < SAMPLE_RATE_MIN || self.sample_rate > SAMPLE_RATE_MAX {
            return Err(format!(
                "sample_rate {} out of range [{}, {}]",
                self.sample_rate, SAMPLE_RATE_MIN, SAMPLE_RATE_MAX
            ));
        }
        if self.buffer_size < BUFFER_SIZE_MIN || self.buffer_size > BUFFER_SIZE_MAX {
            return Err(format!(
                "buffer_size {} out of range [{}, {}]",
                self.buffer_size, BUFFER_SIZE_MIN, BUFFER_SIZE_MAX
            ));
        }
        if self.adc_channels == 0 || self.adc_channels > MAX_CHANNELS {
            return Err(format!(
                "adc_channels {} out of range [1, {}]",
                self.adc_channels, MAX_CHANNELS
            ));
        }
        if self.dac_channels == 0 || self.dac_channels > MAX_CHANNELS {
            return Err(format!(
                "dac_channels {} out of range [1, {}]",
                self.dac_channels, MAX_CHANNELS
            ));
        }
        if !self.analysis_size.is_power_of_two()
            || self.analysis_size < ANALYSIS_SIZE_MIN
            || self.analysis_size > ANALYSIS_SIZE_MAX
        {
            return Err(format!(
                "analysis_size {} must be a power of two in [{}, {}]",
                self.analysis_size, ANALYSIS_SIZE_MIN, ANALYSIS_SIZE_MAX
            ));
        }
        if !(self.gain_min > 0.0 && self.gain_min <= self.gain_max) {
            return Err(format!(
                "gain bounds [{}, {}] invalid",
                self.gain_min, self.gain_max
            ));
        }
        if !(self.gain_min..=self.gain_max).contains(&self.preamp_gain) {
            return Err(format!(
                "preamp_gain {} out of range [{}, {}]",
                self.preamp_gain, self.gain_min, self.gain_max
            ));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        for (name, cutoff) in [("hpf_cutoff", self.hpf_cutoff), ("lpf_cutoff", self.lpf_cutoff)] {
            if !(cutoff > 0.0 && cutoff < nyquist) {
                return Err(format!("{name} {cutoff} out of range (0, {nyquist})"));
            }
        }
        if !(self.overload_threshold > 0.0 && self.overload_threshold <= 1.0) {
            return Err(format!(
                "overload_threshold {} out of range (0, 1]",
                self.overload_threshold
            ));
        }
        if !(self.flux_normalizer > 0.0) {
            return Err(format!(
                "flux_normalizer {} must be positive",
                self.flux_normalizer
            ));
        }
        if !(self.ici_default_ms > 0.0) || self.ici_peak_threshold.is_nan() {
            return Err("ICI parameters invalid".to_string());
        }
        if !(0.0..=1.0).contains(&self.modulation_depth) {
            return Err(format!(
                "modulation_depth {} out of range [0, 1]",
                self.modulation_depth
            ));
        }
        if !(self.voltage_min >= VOLTAGE_RAIL_MIN
            && self.voltage_min < self.voltage_max
            && self.voltage_max <= VOLTAGE_RAIL_MAX)
        {
            return Err(format!(
                "voltage bounds [{}, {}] must lie within rails [{}, {}]",
                self.voltage_min, self.voltage_max, VOLTAGE_RAIL_MIN, VOLTAGE_RAIL_MAX
            ));
        }
        if !(self.thermal_warning_c < self.thermal_critical_c) {
            return Err(format!(
                "thermal_warning_c {} must be below thermal_critical_c {}",
                self.thermal_warning_c, self.thermal_critical_c
            ));
        }
        if self.deadline_escalation_limit == 0
            || self.deadline_escalation_limit > DEADLINE_ESCALATION_MAX
        {
            return Err(format!(
                "deadline_escalation_limit {} out of range [1, {}]",
                self.deadline_escalation_limit, DEADLINE_ESCALATION_MAX
            ));
        }
        if self.calibration_passes < 2 || self.calibration_passes > CALIBRATION_PASSES_MAX {
            return Err(format!(
                "calibration_passes {} out of range [2, {}]",
                self.calibration_passes, CALIBRATION_PASSES_MAX
            ));
        }
        Ok(())
    }

    /// Check a candidate preamp gain against the configured bounds.
    #[inline]
    pub fn gain_in_bounds(&self, gain: f32) -> bool {
        gain >= self.gain_min && gain <= self.gain_max
    }

    /// Duration of one full buffer [µs].
    #[inline]
    pub fn buffer_duration_us(&self) -> f64 {
        self.buffer_size as f64 * 1_000_000.0 / self.sample_rate as f64
    }

    /// Buffer shape handed to the hardware port at init.
    pub fn port_layout(&self) -> PortLayout {
        PortLayout {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
            adc_channels: self.adc_channels,
            dac_channels: self.dac_channels,
        }
    }
}
