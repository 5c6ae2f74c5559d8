//! System-wide constants for the hybrid processing node.
//!
//! Defaults are the values a freshly flashed node runs with; `MIN`/`MAX`
//! pairs bound what `NodeConfig::validate()` accepts.

// ─── Firmware Identity ──────────────────────────────────────────────

/// Version string reported by `HybridNode::version()`.
pub const FIRMWARE_VERSION: &str = "1.0.0-hybrid-node";

// ─── Acquisition ────────────────────────────────────────────────────

/// Default sample rate [Hz].
pub const SAMPLE_RATE_DEFAULT: u32 = 48_000;
/// Minimum sample rate [Hz].
pub const SAMPLE_RATE_MIN: u32 = 8_000;
/// Maximum sample rate [Hz].
pub const SAMPLE_RATE_MAX: u32 = 192_000;

/// Default frames per cycle.
pub const BUFFER_SIZE_DEFAULT: usize = 512;
/// Minimum frames per cycle.
pub const BUFFER_SIZE_MIN: usize = 16;
/// Maximum frames per cycle.
pub const BUFFER_SIZE_MAX: usize = 4096;

/// Hard upper bound on input or output channels.
pub const MAX_CHANNELS: usize = 8;
/// Default ADC channel count.
pub const ADC_CHANNELS_DEFAULT: usize = 2;
/// Default DAC channel count (2 passthrough + 2 control voltages).
pub const DAC_CHANNELS_DEFAULT: usize = 4;
/// Number of DAC channels that carry conditioned passthrough.
pub const PASSTHROUGH_CHANNELS: usize = 2;
/// DAC channel carrying control voltage 1.
pub const CV1_CHANNEL: usize = 2;
/// DAC channel carrying control voltage 2.
pub const CV2_CHANNEL: usize = 3;

// ─── Conditioning ───────────────────────────────────────────────────

/// Default high-pass cutoff [Hz].
pub const HPF_CUTOFF_DEFAULT: f32 = 120.0;
/// Default low-pass cutoff [Hz].
pub const LPF_CUTOFF_DEFAULT: f32 = 8_000.0;

/// Default preamp gain (linear).
pub const PREAMP_GAIN_DEFAULT: f32 = 10.0;
/// Default preamp floor (0 dB).
pub const GAIN_MIN_DEFAULT: f32 = 1.0;
/// Default preamp ceiling (32 dB).
pub const GAIN_MAX_DEFAULT: f32 = 40.0;
/// Multiplicative gain step applied on every overloaded cycle.
pub const GAIN_REDUCTION_FACTOR: f32 = 0.9;

/// Peak level (fraction of full scale) above which a cycle is overloaded.
pub const OVERLOAD_THRESHOLD_DEFAULT: f32 = 0.95;

// ─── Analysis ───────────────────────────────────────────────────────

/// Default spectral window length [samples].
pub const ANALYSIS_SIZE_DEFAULT: usize = 1024;
/// Minimum spectral window length [samples].
pub const ANALYSIS_SIZE_MIN: usize = 64;
/// Maximum spectral window length [samples].
pub const ANALYSIS_SIZE_MAX: usize = 16_384;

/// Flux value that maps to zero coherence [Hz].
pub const FLUX_NORMALIZER_DEFAULT: f32 = 1_000.0;
/// Capacity of the flux history ring.
pub const ICI_RING_CAPACITY: usize = 32;
/// Flux value above which a ring entry counts as a peak.
pub const ICI_PEAK_THRESHOLD_DEFAULT: f32 = 0.5;
/// ICI reported while fewer than two peaks are in the ring [ms].
pub const ICI_DEFAULT_MS: f32 = 100.0;
/// Lower bound applied to ICI before it drives the rate channel [ms].
pub const ICI_RATE_FLOOR_MS: f32 = 10.0;

// ─── Modulation ─────────────────────────────────────────────────────

/// Default modulation depth [0, 1].
pub const MODULATION_DEPTH_DEFAULT: f32 = 0.8;
/// Default control loop rate [Hz] (informational).
pub const CONTROL_LOOP_RATE_DEFAULT: f32 = 100.0;

// ─── Safety ─────────────────────────────────────────────────────────

/// Default actuation ceiling [V].
pub const VOLTAGE_MAX_DEFAULT: f32 = 5.0;
/// Default actuation floor [V].
pub const VOLTAGE_MIN_DEFAULT: f32 = 0.0;
/// Physical DAC rail ceiling [V]. Nothing above this reaches the port.
pub const VOLTAGE_RAIL_MAX: f32 = 5.0;
/// Physical DAC rail floor [V].
pub const VOLTAGE_RAIL_MIN: f32 = 0.0;

/// Default thermal warning threshold [°C].
pub const THERMAL_WARNING_DEFAULT: f32 = 70.0;
/// Default thermal critical threshold [°C].
pub const THERMAL_CRITICAL_DEFAULT: f32 = 85.0;
/// Temperature assumed before the first sensor reading [°C].
pub const AMBIENT_TEMPERATURE: f32 = 25.0;

/// Consecutive deadline misses before escalation to Fault.
pub const DEADLINE_ESCALATION_DEFAULT: u32 = 8;
/// Maximum accepted deadline escalation limit.
pub const DEADLINE_ESCALATION_MAX: u32 = 10_000;

// ─── Calibration ────────────────────────────────────────────────────

/// Default number of quiet buffers averaged for offset measurement.
pub const CALIBRATION_PASSES_DEFAULT: u32 = 10;
/// Maximum number of calibration passes.
pub const CALIBRATION_PASSES_MAX: u32 = 1_000;
/// Default round-trip latency budget for the node [µs].
pub const LATENCY_BUDGET_US_DEFAULT: u32 = 2_000;
/// Round-trip latency budget for the transport self-test [µs].
pub const TRANSPORT_LATENCY_BUDGET_US: f64 = 40.0;
/// Jitter budget for the transport self-test [µs].
pub const TRANSPORT_JITTER_BUDGET_US: f64 = 5.0;
/// Default transport self-test iteration count.
pub const TRANSPORT_SELF_TEST_ITERATIONS: u32 = 100;

// ─── Sensor Front-End ───────────────────────────────────────────────

/// Channels on the Φ-sensor front-end.
pub const SENSOR_CHANNELS: usize = 4;
/// Full-scale code of the 12-bit sensor ADC.
pub const SENSOR_ADC_MAX: u16 = 4095;
/// Sensor ADC reference voltage [V].
pub const SENSOR_VREF: f32 = 3.3;
/// EMA smoothing factor for sensor channels.
pub const SENSOR_SMOOTHING_ALPHA: f32 = 0.3;

// ─── Synchronization ────────────────────────────────────────────────

/// Sync pulse rate [Hz].
pub const SYNC_PULSE_HZ: u32 = 1_000;
/// Default drift measurement window [µs].
pub const DRIFT_WINDOW_US: u64 = 1_000_000;
