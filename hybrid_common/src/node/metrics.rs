//! Metric and telemetry records.
//!
//! Everything here is `Copy` so that snapshots can be taken by value
//! without allocating.

use serde::{Deserialize, Serialize};

use crate::consts::{AMBIENT_TEMPERATURE, SENSOR_CHANNELS};
use crate::node::calibration::CalibrationProfile;
use crate::node::config::OperatingMode;
use crate::node::error::SafetyFlags;
use crate::node::state::{NodeLifecycle, SafetyState};

// ─── Acquisition ────────────────────────────────────────────────────

/// One converted reading from a sensor channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    /// Raw ADC code.
    pub raw: u16,
    /// Physical value [V].
    pub voltage: f32,
    /// Normalized value in [0, 1].
    pub normalized: f32,
    /// Acquisition time [µs].
    pub timestamp_us: u64,
}

/// One acquisition of every sensor channel.
pub type SensorFrame = heapless::Vec<ChannelSample, SENSOR_CHANNELS>;

/// Level metrics computed by the conditioner over one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalogMetrics {
    pub rms: f32,
    pub peak: f32,
    pub dc_offset: f32,
    pub is_overloaded: bool,
}

// ─── Analysis ───────────────────────────────────────────────────────

/// Output of the metric analyzer for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFrame {
    /// Magnitude-weighted mean frequency [Hz].
    pub spectral_centroid: f32,
    /// |centroid − previous centroid| [Hz].
    pub spectral_flux: f32,
    /// Sign changes per window sample.
    pub zero_crossing_rate: f32,
    /// Inter-event interval [ms].
    pub ici_ms: f32,
    /// 1.0 = perfectly stable spectrum.
    pub coherence: f32,
    /// Flux relative to the normalizer, unclamped.
    pub criticality: f32,
    pub timestamp_us: u64,
    /// Strictly increasing while running, restarts at 0 on start.
    pub sequence: u64,
}

impl Default for AnalysisFrame {
    fn default() -> Self {
        Self {
            spectral_centroid: 0.0,
            spectral_flux: 0.0,
            zero_crossing_rate: 0.0,
            ici_ms: crate::consts::ICI_DEFAULT_MS,
            coherence: 1.0,
            criticality: 0.0,
            timestamp_us: 0,
            sequence: 0,
        }
    }
}

// ─── Control ────────────────────────────────────────────────────────

/// Operator set-points.
///
/// `cv1`/`cv2` are manual voltages, used when modulation is disabled or
/// bypassed by the operating mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSetpoints {
    pub phase: f32,
    /// Operator depth in [0, 1].
    pub depth: f32,
    pub cv1: f32,
    pub cv2: f32,
}

/// Actuation values handed to the output stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuationCommand {
    /// Depth channel [V].
    pub cv1: f32,
    /// Rate channel [V].
    pub cv2: f32,
    pub phase: f32,
    pub depth: f32,
}

// ─── Safety ─────────────────────────────────────────────────────────

/// Safety monitor telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyTelemetry {
    pub state: SafetyState,
    /// Raw `SafetyFlags` bits of the last evaluated cycle.
    pub flags: u16,
    /// Raw `SafetyFlags` bits accumulated since the last reset.
    pub sticky_flags: u16,
    pub overload_count: u64,
    pub clamp_count: u64,
    pub deadline_misses: u64,
    pub consecutive_deadline_misses: u32,
    /// Last measured temperature [°C].
    pub temperature_c: f32,
    /// Latched once a thermal warning was seen.
    pub thermal_warning: bool,
}

impl SafetyTelemetry {
    #[inline]
    pub fn flags(&self) -> SafetyFlags {
        SafetyFlags::from_bits_truncate(self.flags)
    }

    #[inline]
    pub fn sticky_flags(&self) -> SafetyFlags {
        SafetyFlags::from_bits_truncate(self.sticky_flags)
    }
}

impl Default for SafetyTelemetry {
    fn default() -> Self {
        Self {
            state: SafetyState::Ok,
            flags: 0,
            sticky_flags: 0,
            overload_count: 0,
            clamp_count: 0,
            deadline_misses: 0,
            consecutive_deadline_misses: 0,
            temperature_c: AMBIENT_TEMPERATURE,
            thermal_warning: false,
        }
    }
}

// ─── Statistics ─────────────────────────────────────────────────────

/// Runtime statistics. A "frame" is one processed buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStatistics {
    pub frames_processed: u64,
    pub frames_dropped: u64,
    /// How closely cv1 follows the operator depth [%].
    pub modulation_fidelity: f32,
    /// Cycle time relative to buffer duration [%].
    pub cpu_load: f32,
    /// Frames per call relative to configured buffer size [%].
    pub buffer_utilization: f32,
    pub uptime_ms: u64,
    pub drift_ppm: f32,
    pub deadline_misses: u64,
    pub last_cycle_us: u64,
    pub max_cycle_us: u64,
    pub avg_cycle_us: u64,
    /// Status publications skipped because a reader held the lock.
    pub publish_skips: u64,
}

// ─── Status ─────────────────────────────────────────────────────────

/// Complete node status snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub lifecycle: NodeLifecycle,
    pub mode: OperatingMode,
    pub is_running: bool,
    pub is_calibrated: bool,
    pub preamp_gain: f32,
    pub analog: AnalogMetrics,
    pub analysis: AnalysisFrame,
    pub setpoints: ControlSetpoints,
    pub command: ActuationCommand,
    pub safety: SafetyTelemetry,
    pub calibration: CalibrationProfile,
    pub stats: RuntimeStatistics,
}
