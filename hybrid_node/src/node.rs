//! Hybrid processing node.
//!
//! [`HybridNode`] owns the hardware port and the whole per-cycle pipeline.
//! There is no global state: every operation goes through the node value.
//!
//! # Cycle
//!
//! ```text
//! process(input, output, frames)
//!   ├─ profile snapshot (try-read, keeps last copy on contention)
//!   ├─ SignalConditioner   → AnalogMetrics + conditioned samples
//!   ├─ MetricAnalyzer      → AnalysisFrame        (DspOnly / Hybrid)
//!   ├─ Modulator           → ActuationCommand     (manual in AnalogOnly)
//!   ├─ thermal read        → temperature          (if enabled)
//!   ├─ deadline check      → DeadlineVerdict
//!   ├─ SafetyMonitor       → gain reduction / emergency shutdown
//!   ├─ output assembly     → passthrough + cv1/cv2
//!   └─ statistics + status publish (try-lock, skip counted)
//! ```
//!
//! # Lifecycle
//!
//! | From | Operation | To |
//! |------|-----------|----|
//! | Uninitialized / Stopped | `init` | Stopped |
//! | Stopped | `start` | Running |
//! | Running | `stop` | Stopped |
//! | any | `emergency_shutdown` | Stopped (Fault) |
//!
//! Configuration and calibration are only accepted while not running.

use std::path::Path;
use std::sync::Arc;

use hybrid_common::consts::{FIRMWARE_VERSION, GAIN_REDUCTION_FACTOR};
use hybrid_common::hal::{HalError, HardwarePort};
use hybrid_common::node::calibration::{CalibrationError, CalibrationProfile};
use hybrid_common::node::config::{NodeConfig, OperatingMode};
use hybrid_common::node::error::{NodeError, SafetyFlags};
use hybrid_common::node::metrics::{
    ActuationCommand, AnalogMetrics, AnalysisFrame, ControlSetpoints, NodeStatus,
    RuntimeStatistics, SafetyTelemetry,
};
use hybrid_common::node::state::{NodeLifecycle, SafetyState};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::analysis::MetricAnalyzer;
use crate::calibration::{CalibrationReport, Calibrator, ProfileSlot};
use crate::control::Modulator;
use crate::control::output::{self, OutputLayout, VoltageBounds};
use crate::safety::{SafetyInputs, SafetyMonitor, ShutdownCause};
use crate::signal::SignalConditioner;
use crate::stats::{CycleStats, cpu_load_percent};

// ─── Status Handle ──────────────────────────────────────────────────

/// Shared, lock-protected copy of the last published [`NodeStatus`].
///
/// The cycle publishes with `try_lock` and never waits; readers take the
/// lock and copy the whole status out.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Mutex<NodeStatus>>,
}

impl StatusHandle {
    /// Copy of the last published status.
    pub fn snapshot(&self) -> NodeStatus {
        *self.inner.lock()
    }

    /// Hold the status lock. The cycle skips publishing while it is held.
    pub fn lock(&self) -> MutexGuard<'_, NodeStatus> {
        self.inner.lock()
    }

    fn try_publish(&self, status: NodeStatus) -> bool {
        match self.inner.try_lock() {
            Some(mut slot) => {
                *slot = status;
                true
            }
            None => false,
        }
    }
}

// ─── Cycle Outcome ──────────────────────────────────────────────────

/// What one `process` call observed. Anomalies are flags, not errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    pub flags: SafetyFlags,
    pub state: SafetyState,
    /// Analysis sequence number, if the analyzer ran.
    pub sequence: Option<u64>,
    /// Set when this cycle ended in emergency shutdown.
    pub shutdown: Option<ShutdownCause>,
    /// Port-clock duration of the cycle [µs].
    pub elapsed_us: u64,
}

// ─── Pipeline ───────────────────────────────────────────────────────

/// Per-configuration processing state, built by `init`.
#[derive(Debug)]
struct Pipeline {
    conditioner: SignalConditioner,
    analyzer: MetricAnalyzer,
    modulator: Modulator,
    layout: OutputLayout,
    /// `buffer_size × adc_channels` conditioned samples.
    conditioned: Vec<f32>,
    /// `buffer_size × dac_channels` zeros for shutdown writes.
    silence: Vec<f32>,
}

impl Pipeline {
    fn new(config: &NodeConfig) -> Self {
        let layout = config.port_layout();
        Self {
            conditioner: SignalConditioner::new(config),
            analyzer: MetricAnalyzer::new(config),
            modulator: Modulator::new(config),
            layout: OutputLayout {
                adc_channels: config.adc_channels,
                dac_channels: config.dac_channels,
                bounds: VoltageBounds::from_config(config),
            },
            conditioned: vec![0.0; layout.input_len()],
            silence: vec![0.0; layout.output_len()],
        }
    }
}

// ─── Node ───────────────────────────────────────────────────────────

/// One hybrid analog/DSP processing node.
pub struct HybridNode<P: HardwarePort> {
    port: P,
    config: NodeConfig,
    lifecycle: NodeLifecycle,
    pipeline: Option<Pipeline>,
    monitor: SafetyMonitor,
    profile: ProfileSlot,
    /// Copy used by the running cycle.
    cycle_profile: CalibrationProfile,
    gain: f32,
    setpoints: ControlSetpoints,
    analog: AnalogMetrics,
    analysis: AnalysisFrame,
    command: ActuationCommand,
    stats: RuntimeStatistics,
    cycle_stats: CycleStats,
    uptime_us: f64,
    status: StatusHandle,
}

impl<P: HardwarePort> HybridNode<P> {
    /// Wrap `port`. The node is `Uninitialized` until [`HybridNode::init`].
    pub fn new(port: P) -> Self {
        let config = NodeConfig::default();
        let profile = CalibrationProfile::identity(config.adc_channels, config.dac_channels);
        Self {
            port,
            lifecycle: NodeLifecycle::Uninitialized,
            pipeline: None,
            monitor: SafetyMonitor::new(&config),
            profile: ProfileSlot::new(profile),
            cycle_profile: profile,
            gain: config.preamp_gain,
            setpoints: ControlSetpoints::default(),
            analog: AnalogMetrics::default(),
            analysis: AnalysisFrame::default(),
            command: ActuationCommand::default(),
            stats: RuntimeStatistics::default(),
            cycle_stats: CycleStats::new(),
            uptime_us: 0.0,
            status: StatusHandle::default(),
            config,
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Validate `config`, initialize the port and build the pipeline.
    ///
    /// # Errors
    /// - `InvalidState` while running
    /// - `InvalidArgument` if the configuration is out of bounds
    /// - `Hardware` if the port rejects the layout or the preamp gain;
    ///   the node is left `Uninitialized`
    pub fn init(&mut self, config: NodeConfig) -> Result<(), NodeError> {
        if self.lifecycle == NodeLifecycle::Running {
            return Err(NodeError::InvalidState("cannot init a running node"));
        }
        config.validate().map_err(NodeError::InvalidArgument)?;

        if self.lifecycle == NodeLifecycle::Stopped {
            if let Err(e) = self.port.shutdown() {
                warn!("Port '{}' shutdown before re-init failed: {e}", self.port.name());
            }
        }
        self.lifecycle = NodeLifecycle::Uninitialized;
        self.pipeline = None;

        let layout = config.port_layout();
        self.port.init(&layout)?;
        self.port.set_input_gain(config.preamp_gain)?;

        let profile = CalibrationProfile::identity(config.adc_channels, config.dac_channels);
        self.profile.install(profile);
        self.cycle_profile = profile;
        self.pipeline = Some(Pipeline::new(&config));
        self.monitor = SafetyMonitor::new(&config);
        self.gain = config.preamp_gain;
        self.analog = AnalogMetrics::default();
        self.analysis = AnalysisFrame::default();
        self.command = ActuationCommand::default();
        self.stats = RuntimeStatistics::default();
        self.cycle_stats.reset();
        self.uptime_us = 0.0;
        self.config = config;
        self.lifecycle = NodeLifecycle::Stopped;

        info!(
            "Node initialized on '{}': {} Hz, {} frames, {} in / {} out, {:?} mode, gain {}",
            self.port.name(),
            self.config.sample_rate,
            self.config.buffer_size,
            self.config.adc_channels,
            self.config.dac_channels,
            self.config.mode,
            self.gain
        );
        self.publish();
        Ok(())
    }

    /// Begin a run.
    ///
    /// Clears a terminal safety state, restarts the analysis sequence and
    /// zeroes the frame counters and uptime. Safety counters survive.
    pub fn start(&mut self) -> Result<(), NodeError> {
        match self.lifecycle {
            NodeLifecycle::Uninitialized => {
                return Err(NodeError::InvalidState("node not initialized"));
            }
            NodeLifecycle::Running => return Err(NodeError::InvalidState("node already running")),
            NodeLifecycle::Stopped => {}
        }
        if self.config.mode == OperatingMode::Calibration {
            return Err(NodeError::InvalidState(
                "calibration mode does not run the cycle",
            ));
        }
        if let Some(pipe) = self.pipeline.as_mut() {
            pipe.analyzer.reset();
        }
        self.monitor.restart();
        self.stats.frames_processed = 0;
        self.stats.frames_dropped = 0;
        self.stats.uptime_ms = 0;
        self.uptime_us = 0.0;
        self.lifecycle = NodeLifecycle::Running;
        info!("Node started ({:?} mode)", self.config.mode);
        self.publish();
        Ok(())
    }

    /// End the run and drive the outputs to zero.
    pub fn stop(&mut self) -> Result<(), NodeError> {
        if self.lifecycle != NodeLifecycle::Running {
            return Err(NodeError::InvalidState("node not running"));
        }
        self.lifecycle = NodeLifecycle::Stopped;
        self.command.cv1 = 0.0;
        self.command.cv2 = 0.0;
        self.write_silence();
        info!(
            "Node stopped after {} frames ({} dropped)",
            self.stats.frames_processed, self.stats.frames_dropped
        );
        self.publish();
        Ok(())
    }

    /// Stop immediately with zeroed actuation and a `Fault` safety state.
    ///
    /// Valid in any lifecycle state.
    pub fn emergency_shutdown(&mut self) {
        self.halt(ShutdownCause::Requested);
    }

    // ─── Cycle ──────────────────────────────────────────────────────

    /// Run one cycle over `frames` interleaved rows.
    ///
    /// `input` holds at least `frames × adc_channels` samples and `output`
    /// at least `frames × dac_channels`.
    ///
    /// # Errors
    /// Only precondition failures, which change nothing: not running,
    /// `frames` zero or above the configured buffer size, short buffers.
    /// Everything observed during the cycle is reported in the outcome.
    pub fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
    ) -> Result<CycleOutcome, NodeError> {
        self.check_cycle_args(input.len(), output.len(), frames)?;
        let Some(pipe) = self.pipeline.as_mut() else {
            return Err(NodeError::InvalidState("node not initialized"));
        };
        let config = &self.config;

        let t0 = self.port.timestamp_us();
        if let Some(profile) = self.profile.try_snapshot() {
            self.cycle_profile = profile;
        }

        // Conditioning
        self.analog =
            pipe.conditioner
                .condition(input, &mut pipe.conditioned, frames, &self.cycle_profile);

        // Analysis + modulation
        let analyzing = config.mode.runs_analysis() && config.enable_dsp;
        let modulation = if analyzing {
            self.analysis = pipe.analyzer.analyze(&pipe.conditioned, frames, t0);
            pipe.modulator.modulate(&self.analysis, &self.setpoints)
        } else {
            pipe.modulator.manual(&self.setpoints)
        };
        self.command = modulation.command;

        // Thermal
        let mut hardware_fault = false;
        let temperature_c = if self.monitor.thermal_enabled() {
            match self.port.read_temperature(config.thermal_sensor_channel) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("Thermal read failed: {e}");
                    hardware_fault = true;
                    None
                }
            }
        } else {
            None
        };

        // Deadline
        let budget_us = frames as f64 * 1_000_000.0 / config.sample_rate as f64;
        let elapsed_us = self.port.timestamp_us().saturating_sub(t0);
        let deadline = self.monitor.check_deadline(elapsed_us, budget_us as u64);

        let verdict = self.monitor.evaluate(&SafetyInputs {
            overloaded: self.analog.is_overloaded,
            gain_above_floor: self.gain > config.gain_min,
            temperature_c,
            at_ceiling: modulation.at_ceiling,
            deadline,
            hardware_fault,
        });
        let mut flags = verdict.flags;

        if verdict.reduce_gain {
            let reduced = (self.gain * GAIN_REDUCTION_FACTOR).max(config.gain_min);
            match self.port.set_input_gain(reduced) {
                Ok(()) => self.gain = reduced,
                Err(e) => {
                    warn!("Gain reduction to {reduced} failed: {e}");
                    flags |= SafetyFlags::HARDWARE_FAULT;
                    self.monitor.note_hardware_fault();
                }
            }
        }

        // Output
        match verdict.shutdown {
            Some(cause) => {
                output::silence(output, frames, self.config.dac_channels);
                self.halt(cause);
            }
            None => {
                if let Some(pipe) = self.pipeline.as_ref() {
                    output::assemble(
                        output,
                        &pipe.conditioned,
                        frames,
                        pipe.layout,
                        self.config.mode.passes_audio(),
                        &self.command,
                        &self.cycle_profile,
                    );
                }
            }
        }

        // Statistics
        self.cycle_stats.record(elapsed_us, budget_us as u64);
        self.uptime_us += budget_us;
        let stats = &mut self.stats;
        stats.frames_processed += 1;
        stats.uptime_ms = (self.uptime_us / 1_000.0) as u64;
        stats.cpu_load = cpu_load_percent(elapsed_us, budget_us);
        stats.buffer_utilization = frames as f32 / self.config.buffer_size as f32 * 100.0;
        stats.modulation_fidelity = modulation.fidelity;
        stats.deadline_misses = self.monitor.telemetry().deadline_misses;
        stats.last_cycle_us = self.cycle_stats.last_cycle_us;
        stats.max_cycle_us = self.cycle_stats.max_cycle_us;
        stats.avg_cycle_us = self.cycle_stats.avg_cycle_us();
        self.publish();

        Ok(CycleOutcome {
            flags,
            state: self.monitor.state(),
            sequence: analyzing.then_some(self.analysis.sequence),
            shutdown: verdict.shutdown,
            elapsed_us,
        })
    }

    /// Count a buffer lost to a port failure outside `process`.
    pub fn record_dropped_frame(&mut self, error: &HalError) {
        self.stats.frames_dropped += 1;
        self.monitor.note_hardware_fault();
        warn!("Frame dropped: {error}");
    }

    /// Store the drift measured against the sync pulse.
    pub fn set_drift_ppm(&mut self, ppm: f32) {
        self.stats.drift_ppm = ppm;
    }

    // ─── Control Surface ────────────────────────────────────────────

    /// Set the analog preamp gain.
    ///
    /// # Errors
    /// `InvalidArgument` outside `[gain_min, gain_max]`; `Hardware` if the
    /// port rejects it. The previous gain is kept on error.
    pub fn set_preamp_gain(&mut self, gain: f32) -> Result<(), NodeError> {
        if !self.config.gain_in_bounds(gain) {
            return Err(NodeError::InvalidArgument(format!(
                "preamp gain {gain} out of range [{}, {}]",
                self.config.gain_min, self.config.gain_max
            )));
        }
        if self.lifecycle != NodeLifecycle::Uninitialized {
            self.port.set_input_gain(gain)?;
        }
        self.gain = gain;
        self.config.preamp_gain = gain;
        debug!("Preamp gain set to {gain}");
        self.publish();
        Ok(())
    }

    /// Set the operator set-points. Manual voltages are clamped like outputs.
    pub fn set_control_setpoints(&mut self, setpoints: ControlSetpoints) -> Result<(), NodeError> {
        let finite = [setpoints.phase, setpoints.depth, setpoints.cv1, setpoints.cv2]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(NodeError::InvalidArgument(
                "set-points must be finite".into(),
            ));
        }
        if !(0.0..=1.0).contains(&setpoints.depth) {
            return Err(NodeError::InvalidArgument(format!(
                "depth set-point {} out of range [0, 1]",
                setpoints.depth
            )));
        }
        let mut setpoints = setpoints;
        if self.config.enable_voltage_clamp {
            let (lo, hi) = (self.config.voltage_min, self.config.voltage_max);
            setpoints.cv1 = setpoints.cv1.clamp(lo, hi);
            setpoints.cv2 = setpoints.cv2.clamp(lo, hi);
        }
        self.setpoints = setpoints;
        self.publish();
        Ok(())
    }

    /// Change the operating mode while not running.
    pub fn set_mode(&mut self, mode: OperatingMode) -> Result<(), NodeError> {
        if self.lifecycle == NodeLifecycle::Running {
            return Err(NodeError::InvalidState("cannot change mode while running"));
        }
        if self.config.mode != mode {
            info!("Operating mode {:?} → {:?}", self.config.mode, mode);
        }
        self.config.mode = mode;
        self.publish();
        Ok(())
    }

    /// Replace the whole configuration of a stopped node.
    ///
    /// Re-initializes the port and the pipeline; filter state, analysis
    /// history and the calibration profile start over.
    pub fn configure(&mut self, config: NodeConfig) -> Result<(), NodeError> {
        match self.lifecycle {
            NodeLifecycle::Running => {
                Err(NodeError::InvalidState("cannot configure a running node"))
            }
            NodeLifecycle::Uninitialized => Err(NodeError::InvalidState("node not initialized")),
            NodeLifecycle::Stopped => self.init(config),
        }
    }

    /// Zero statistics and cycle timing.
    pub fn reset_statistics(&mut self) {
        self.stats = RuntimeStatistics::default();
        self.cycle_stats.reset();
        self.uptime_us = 0.0;
        info!("Statistics reset");
        self.publish();
    }

    /// Operator reset of safety counters and sticky flags.
    ///
    /// A terminal state is cleared only while the node is not running.
    pub fn reset_safety(&mut self) {
        let clear_terminal = self.lifecycle != NodeLifecycle::Running;
        self.monitor.reset(clear_terminal);
        self.publish();
    }

    // ─── Calibration ────────────────────────────────────────────────

    /// Measure input offsets and round-trip latency, then install the
    /// new profile.
    pub fn calibrate(&mut self) -> Result<CalibrationReport, NodeError> {
        match self.lifecycle {
            NodeLifecycle::Running => {
                return Err(NodeError::InvalidState(
                    "calibration requires a stopped node",
                ));
            }
            NodeLifecycle::Uninitialized => {
                return Err(NodeError::InvalidState("node not initialized"));
            }
            NodeLifecycle::Stopped => {}
        }
        let calibrator = Calibrator::new(
            self.config.port_layout(),
            self.config.calibration_passes,
            self.config.latency_budget_us,
        )?;
        let report = calibrator.run(&mut self.port, &self.profile.snapshot())?;
        self.profile.install(report.profile);
        self.cycle_profile = report.profile;
        info!(
            "Calibration revision {} installed ({} µs round trip, {})",
            report.profile.revision,
            report.latency.measured_us,
            if report.latency.passed { "within budget" } else { "over budget" }
        );
        self.publish();
        Ok(report)
    }

    /// Write the live profile to `path`.
    ///
    /// # Errors
    /// `NotCalibrated` if no valid profile is installed.
    pub fn save_calibration(&self, path: &Path) -> Result<(), NodeError> {
        let profile = self.profile.snapshot();
        if !profile.is_valid {
            return Err(CalibrationError::NotCalibrated.into());
        }
        profile.save_to_file(path)?;
        info!(
            "Calibration revision {} saved to {}",
            profile.revision,
            path.display()
        );
        Ok(())
    }

    /// Replace the live profile with the one stored at `path`.
    ///
    /// On any error the live profile is left untouched.
    pub fn load_calibration(&mut self, path: &Path) -> Result<(), NodeError> {
        let profile = CalibrationProfile::load_from_file(path)?;
        if self.lifecycle != NodeLifecycle::Uninitialized
            && (profile.input_channels as usize != self.config.adc_channels
                || profile.output_channels as usize != self.config.dac_channels)
        {
            return Err(NodeError::InvalidArgument(format!(
                "profile shape {}/{} does not match {}/{} channels",
                profile.input_channels,
                profile.output_channels,
                self.config.adc_channels,
                self.config.dac_channels
            )));
        }
        if !profile.has_finite_corrections() {
            return Err(NodeError::InvalidArgument(format!(
                "profile revision {} has non-finite corrections",
                profile.revision
            )));
        }
        self.profile.install(profile);
        self.cycle_profile = profile;
        info!(
            "Calibration revision {} loaded from {}",
            profile.revision,
            path.display()
        );
        self.publish();
        Ok(())
    }

    /// Shared slot holding the live calibration profile.
    pub fn profile_slot(&self) -> &ProfileSlot {
        &self.profile
    }

    // ─── Snapshots ──────────────────────────────────────────────────

    pub fn version(&self) -> &'static str {
        FIRMWARE_VERSION
    }

    /// Full status, built from the live state.
    ///
    /// Reads the shared profile slot and may wait for an install in
    /// progress; the cycle publishes from its own copy instead.
    pub fn status(&self) -> NodeStatus {
        self.build_status(self.profile.snapshot())
    }

    fn build_status(&self, calibration: CalibrationProfile) -> NodeStatus {
        NodeStatus {
            lifecycle: self.lifecycle,
            mode: self.config.mode,
            is_running: self.is_running(),
            is_calibrated: calibration.is_valid,
            preamp_gain: self.gain,
            analog: self.analog,
            analysis: self.analysis,
            setpoints: self.setpoints,
            command: self.command,
            safety: *self.monitor.telemetry(),
            calibration,
            stats: self.stats,
        }
    }

    #[inline]
    pub fn analysis(&self) -> AnalysisFrame {
        self.analysis
    }

    #[inline]
    pub fn analog(&self) -> AnalogMetrics {
        self.analog
    }

    #[inline]
    pub fn command(&self) -> ActuationCommand {
        self.command
    }

    #[inline]
    pub fn safety(&self) -> SafetyTelemetry {
        *self.monitor.telemetry()
    }

    #[inline]
    pub fn statistics(&self) -> RuntimeStatistics {
        self.stats
    }

    /// Handle for reading published status from another thread.
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.lifecycle == NodeLifecycle::Running
    }

    #[inline]
    pub fn lifecycle(&self) -> NodeLifecycle {
        self.lifecycle
    }

    #[inline]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    #[inline]
    pub fn preamp_gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn port(&self) -> &P {
        &self.port
    }

    #[inline]
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn check_cycle_args(&self, input_len: usize, output_len: usize, frames: usize) -> Result<(), NodeError> {
        if self.config.mode == OperatingMode::Calibration && self.is_running() {
            return Err(NodeError::InvalidState(
                "calibration mode does not run the cycle",
            ));
        }
        if !self.is_running() {
            return Err(NodeError::InvalidState("node not running"));
        }
        if frames == 0 || frames > self.config.buffer_size {
            return Err(NodeError::InvalidArgument(format!(
                "frame count {frames} out of range [1, {}]",
                self.config.buffer_size
            )));
        }
        let need_in = frames * self.config.adc_channels;
        let need_out = frames * self.config.dac_channels;
        if input_len < need_in {
            return Err(NodeError::InvalidArgument(format!(
                "input buffer holds {input_len} samples, need {need_in}"
            )));
        }
        if output_len < need_out {
            return Err(NodeError::InvalidArgument(format!(
                "output buffer holds {output_len} samples, need {need_out}"
            )));
        }
        Ok(())
    }

    /// Emergency shutdown. Safe to call from inside the cycle.
    fn halt(&mut self, cause: ShutdownCause) {
        if self.lifecycle == NodeLifecycle::Running {
            self.lifecycle = NodeLifecycle::Stopped;
        }
        self.command.cv1 = 0.0;
        self.command.cv2 = 0.0;
        self.write_silence();
        self.monitor.enter_shutdown(cause);
        error!("EMERGENCY SHUTDOWN ({cause})");
        self.publish();
    }

    fn write_silence(&mut self) {
        if let Some(pipe) = self.pipeline.as_ref() {
            if let Err(e) = self.port.write(&pipe.silence, self.config.buffer_size) {
                warn!("Zero write on '{}' failed: {e}", self.port.name());
                self.monitor.note_hardware_fault();
            }
        }
    }

    fn publish(&mut self) {
        let status = self.build_status(self.cycle_profile);
        if !self.status.try_publish(status) {
            self.stats.publish_skips += 1;
        }
    }
}

impl<P: HardwarePort> Drop for HybridNode<P> {
    fn drop(&mut self) {
        if self.lifecycle != NodeLifecycle::Uninitialized {
            if self.is_running() {
                self.write_silence();
            }
            if let Err(e) = self.port.shutdown() {
                warn!("Port '{}' shutdown failed: {e}", self.port.name());
            }
        }
    }
}
