//! Integration test: calibration routine and profile persistence.
//!
//! 1. Offsets cancel a known DC level; round-trip latency is measured
//!    on the port's clock and checked against the budget (inclusive)
//! 2. A saved profile reloads bit-for-bit into another node
//! 3. A damaged, mismatched or non-finite file leaves the live profile
//!    untouched

use hybrid_common::node::calibration::{CalibrationError, CalibrationProfile, RECORD_SIZE};
use hybrid_common::node::config::{NodeConfig, OperatingMode};
use hybrid_common::node::error::NodeError;
use hybrid_hal::backends::simulation::{SignalSource, SimulatedPort, SimulationSettings};
use hybrid_node::node::HybridNode;
use std::fs;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

fn stopped(config: NodeConfig, settings: SimulationSettings) -> HybridNode<SimulatedPort> {
    let mut node = HybridNode::new(SimulatedPort::new(settings));
    node.init(config).unwrap();
    node
}

fn latency_settings(read_us: u64, write_us: u64) -> SimulationSettings {
    SimulationSettings {
        clock_step_us: 0,
        read_latency_us: read_us,
        write_latency_us: write_us,
        ..Default::default()
    }
}

fn calibrated_node() -> HybridNode<SimulatedPort> {
    let settings = SimulationSettings {
        signal: SignalSource::Dc { level: 0.01 },
        ..Default::default()
    };
    let mut node = stopped(NodeConfig::default(), settings);
    node.calibrate().unwrap();
    node
}

// ── Routine ─────────────────────────────────────────────────────────

#[test]
fn offsets_cancel_input_dc() {
    let settings = SimulationSettings {
        signal: SignalSource::Dc { level: 0.01 },
        ..Default::default()
    };
    let config = NodeConfig {
        enable_analog_filter: false,
        ..Default::default()
    };
    let mut node = stopped(config, settings);
    let report = node.calibrate().unwrap();

    // Preamp gain 10 on a 10 mV source.
    let level = 0.01f32 * 10.0;
    assert_eq!(report.passes, 10);
    for ch in 0..2 {
        assert!((report.profile.input_offset[ch] + level).abs() < 1e-6);
    }
    assert!(report.profile.is_valid);
    assert_eq!(report.profile.revision, 1);
    assert!(node.status().is_calibrated);

    // The corrected input is centred on zero.
    node.start().unwrap();
    let input = vec![level; 512 * 2];
    let mut output = vec![0.0; 512 * 4];
    node.process(&input, &mut output, 512).unwrap();
    assert!(node.analog().dc_offset.abs() < 1e-6);
}

#[test]
fn revision_advances_per_run() {
    let mut node = calibrated_node();
    let second = node.calibrate().unwrap();
    assert_eq!(second.profile.revision, 2);
}

#[test]
fn latency_budget_is_inclusive() {
    let mut node = stopped(NodeConfig::default(), latency_settings(1_000, 1_000));
    let report = node.calibrate().unwrap();
    assert_eq!(report.latency.measured_us, 2_000);
    assert!(report.latency.passed);
    assert_eq!(report.profile.total_latency_us, 2_000);
    assert_eq!(report.profile.acquisition_latency_us, 666);

    let mut node = stopped(NodeConfig::default(), latency_settings(1_000, 1_001));
    let report = node.calibrate().unwrap();
    assert_eq!(report.latency.measured_us, 2_001);
    assert!(!report.latency.passed);
    // Over budget is reported, the profile is still installed.
    assert!(node.profile_slot().snapshot().is_valid);
}

#[test]
fn calibration_mode_only_allows_calibrate() {
    let config = NodeConfig {
        mode: OperatingMode::Calibration,
        ..Default::default()
    };
    let mut node = stopped(config, SimulationSettings::default());
    assert!(matches!(node.start(), Err(NodeError::InvalidState(_))));
    node.calibrate().unwrap();
    assert!(node.status().is_calibrated);
}

// ── Persistence ─────────────────────────────────────────────────────

#[test]
fn saved_profile_reloads_bit_exact_in_another_node() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("node.cal");

    let node = calibrated_node();
    node.save_calibration(&path).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), RECORD_SIZE as u64);

    let mut other = stopped(NodeConfig::default(), SimulationSettings::default());
    assert!(!other.status().is_calibrated);
    other.load_calibration(&path).unwrap();

    let saved = node.profile_slot().snapshot();
    let loaded = other.profile_slot().snapshot();
    assert!(loaded.bit_eq(&saved));
    assert!(other.status().is_calibrated);
}

#[test]
fn uncalibrated_node_refuses_to_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("node.cal");
    let node = stopped(NodeConfig::default(), SimulationSettings::default());

    let err = node.save_calibration(&path).unwrap_err();
    assert_eq!(err, NodeError::Calibration(CalibrationError::NotCalibrated));
    assert!(!path.exists());
}

#[test]
fn truncated_file_keeps_live_profile() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.cal");
    let short = dir.path().join("short.cal");

    let mut node = calibrated_node();
    node.save_calibration(&good).unwrap();
    let bytes = fs::read(&good).unwrap();
    fs::write(&short, &bytes[..RECORD_SIZE / 2]).unwrap();

    let before = node.profile_slot().snapshot();
    let err = node.load_calibration(&short).unwrap_err();
    assert_eq!(
        err,
        NodeError::Calibration(CalibrationError::Truncated {
            expected: RECORD_SIZE,
            actual: RECORD_SIZE / 2,
        })
    );
    assert!(node.profile_slot().snapshot().bit_eq(&before));
}

#[test]
fn missing_file_keeps_live_profile() {
    let dir = TempDir::new().unwrap();
    let mut node = calibrated_node();
    let before = node.profile_slot().snapshot();

    let err = node.load_calibration(&dir.path().join("absent.cal")).unwrap_err();
    assert!(matches!(err, NodeError::Calibration(CalibrationError::Io(_))));
    assert!(node.profile_slot().snapshot().bit_eq(&before));
}

#[test]
fn profile_for_other_channel_layout_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("node.cal");
    calibrated_node().save_calibration(&path).unwrap();

    let config = NodeConfig {
        adc_channels: 1,
        ..Default::default()
    };
    let mut mono = stopped(config, SimulationSettings::default());
    let err = mono.load_calibration(&path).unwrap_err();
    assert!(matches!(err, NodeError::InvalidArgument(_)));
    assert!(!mono.status().is_calibrated);
}

#[test]
fn non_finite_output_gain_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nan.cal");

    let mut node = calibrated_node();
    let before = node.profile_slot().snapshot();
    let mut damaged = before;
    damaged.output_gain[3] = f32::NAN;
    damaged.revision += 1;
    damaged.save_to_file(&path).unwrap();
    assert!(CalibrationProfile::load_from_file(&path).is_ok());

    let err = node.load_calibration(&path).unwrap_err();
    assert!(matches!(err, NodeError::InvalidArgument(_)));
    assert!(node.profile_slot().snapshot().bit_eq(&before));
}
