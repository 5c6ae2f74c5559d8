//! Integration test: config file → backend registry → paced cycle runner.

use hybrid_common::hal::HardwarePort;
use hybrid_common::node::config::NodeConfig;
use hybrid_common::node::error::SafetyFlags;
use hybrid_common::node::state::SafetyState;
use hybrid_hal::backends::simulation::{FailurePoint, SimulatedPort};
use hybrid_node::config::load_config;
use hybrid_node::node::HybridNode;
use hybrid_node::runner::CycleRunner;
use std::io::Write;
use std::sync::atomic::AtomicBool;
use tempfile::NamedTempFile;

// ── Helpers ─────────────────────────────────────────────────────────

const CONFIG: &str = r#"
[shared]
service_name = "runner-test"

[node]
buffer_size = 64
enable_thermal_monitor = true

[backend]
name = "simulation"

[backend.options]
temperature_c = 80.0
temperature_ramp_c = 5.0

[backend.options.signal]
kind = "sine"
amplitude = 0.02
frequency_hz = 750.0
"#;

fn node_from_file(text: &str) -> HybridNode<Box<dyn HardwarePort>> {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    let config = load_config(file.path()).unwrap();

    let registry = hybrid_hal::default_registry();
    let port = registry
        .create_port(&config.backend.name, &config.backend.options)
        .unwrap();
    let mut node = HybridNode::new(port);
    node.init(config.node).unwrap();
    node
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn file_configured_node_runs_until_thermal_shutdown() {
    let mut node = node_from_file(CONFIG);
    node.start().unwrap();
    let mut runner = CycleRunner::new(node).unwrap();

    // Sensor reads 80 → 85 → 90 °C; the third cycle is over the limit.
    let executed = runner.run_for(10).unwrap();
    assert_eq!(executed, 3);

    let node = runner.into_node();
    assert!(!node.is_running());
    let safety = node.safety();
    assert_eq!(safety.state, SafetyState::ThermalCritical);
    assert!(safety.thermal_warning);
    assert!(safety.sticky_flags().contains(SafetyFlags::THERMAL_WARNING | SafetyFlags::SHUTDOWN));
    assert_eq!(node.statistics().frames_processed, 3);
}

#[test]
fn runner_output_reaches_the_port() {
    let mut node = HybridNode::new(SimulatedPort::default());
    node.init(NodeConfig {
        buffer_size: 64,
        ..Default::default()
    })
    .unwrap();
    node.start().unwrap();
    let mut runner = CycleRunner::new(node).unwrap();

    assert_eq!(runner.run_for(4).unwrap(), 4);
    assert_eq!(runner.node().port().writes(), 4);
    assert_eq!(runner.node().port().last_output(), runner.output());
    assert_eq!(runner.node().statistics().frames_processed, 4);
}

#[test]
fn port_failures_drop_frames_without_stopping() {
    let mut node = HybridNode::new(SimulatedPort::default());
    node.init(NodeConfig {
        buffer_size: 64,
        ..Default::default()
    })
    .unwrap();
    node.start().unwrap();
    let mut runner = CycleRunner::new(node).unwrap();

    runner.node_mut().port_mut().inject_failure(FailurePoint::Read, true);
    assert!(runner.tick().unwrap().is_none());
    assert!(runner.tick().unwrap().is_none());

    runner.node_mut().port_mut().inject_failure(FailurePoint::Read, false);
    assert!(runner.tick().unwrap().is_some());

    let node = runner.node();
    assert!(node.is_running());
    assert_eq!(node.statistics().frames_dropped, 2);
    assert_eq!(node.statistics().frames_processed, 1);
    assert!(node.safety().sticky_flags().contains(SafetyFlags::HARDWARE_FAULT));
}

#[test]
fn cleared_run_flag_executes_nothing() {
    let mut node = node_from_file(CONFIG);
    node.start().unwrap();
    let mut runner = CycleRunner::new(node).unwrap();
    assert_eq!(runner.run_until(&AtomicBool::new(false)).unwrap(), 0);
    assert!(runner.node().is_running());
}
