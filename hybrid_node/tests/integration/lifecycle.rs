//! Integration test: lifecycle guards and the operator control surface.
//!
//! 1. Every operation is refused in the wrong lifecycle state
//! 2. A refused operation changes nothing
//! 3. Emergency shutdown is accepted from any state

use hybrid_common::node::error::NodeError;
use hybrid_common::node::config::{NodeConfig, OperatingMode};
use hybrid_common::node::state::{NodeLifecycle, SafetyState};
use hybrid_hal::backends::simulation::SimulatedPort;
use hybrid_node::node::HybridNode;
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

fn stopped_node() -> HybridNode<SimulatedPort> {
    let mut node = HybridNode::new(SimulatedPort::default());
    node.init(NodeConfig::default()).unwrap();
    node
}

fn running_node() -> HybridNode<SimulatedPort> {
    let mut node = stopped_node();
    node.start().unwrap();
    node
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn start_twice_is_refused() {
    let mut node = running_node();
    let err = node.start().unwrap_err();
    assert!(matches!(err, NodeError::InvalidState(_)));
    assert!(node.is_running());
}

#[test]
fn stop_while_stopped_is_refused() {
    let mut node = stopped_node();
    assert!(matches!(node.stop(), Err(NodeError::InvalidState(_))));
    assert_eq!(node.lifecycle(), NodeLifecycle::Stopped);
}

#[test]
fn uninitialized_node_refuses_everything() {
    let mut node = HybridNode::new(SimulatedPort::default());
    assert!(node.start().is_err());
    assert!(node.stop().is_err());
    assert!(node.calibrate().is_err());
    let mut output = [0.0; 8];
    assert!(node.process(&[0.0; 4], &mut output, 2).is_err());
    assert!(!node.port().is_initialized());
}

#[test]
fn calibrate_while_running_is_refused() {
    let mut node = running_node();
    let before = node.profile_slot().snapshot();
    assert!(matches!(node.calibrate(), Err(NodeError::InvalidState(_))));
    assert!(node.profile_slot().snapshot().bit_eq(&before));
    assert!(node.is_running());
}

#[test]
fn mode_and_configuration_are_locked_while_running() {
    let mut node = running_node();
    assert!(node.set_mode(OperatingMode::AnalogOnly).is_err());
    assert!(node.configure(NodeConfig::default()).is_err());
    assert_eq!(node.config().mode, OperatingMode::Hybrid);

    node.stop().unwrap();
    node.set_mode(OperatingMode::AnalogOnly).unwrap();
    assert_eq!(node.config().mode, OperatingMode::AnalogOnly);
}

#[test]
fn emergency_shutdown_from_every_state() {
    // Uninitialized
    let mut node = HybridNode::new(SimulatedPort::default());
    node.emergency_shutdown();
    assert!(!node.is_running());
    assert_eq!(node.safety().state, SafetyState::Fault);

    // Stopped
    let mut node = stopped_node();
    node.emergency_shutdown();
    assert_eq!(node.lifecycle(), NodeLifecycle::Stopped);
    assert_eq!(node.safety().state, SafetyState::Fault);

    // Running
    let mut node = running_node();
    let handle = node.status_handle();
    node.emergency_shutdown();
    assert!(!node.is_running());
    assert_eq!(node.command().cv1, 0.0);
    assert_eq!(node.command().cv2, 0.0);
    assert!(node.port().last_output().iter().all(|&v| v == 0.0));

    let status = handle.snapshot();
    assert!(!status.is_running);
    assert_eq!(status.safety.state, SafetyState::Fault);
}

#[test]
fn restart_after_emergency_shutdown_clears_fault() {
    let mut node = running_node();
    node.emergency_shutdown();
    node.start().unwrap();
    assert!(node.is_running());
    assert_eq!(node.safety().state, SafetyState::Ok);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The preamp gain is accepted exactly inside `[gain_min, gain_max]`,
    /// and a rejected value leaves the previous gain in place.
    #[test]
    fn preamp_gain_accepted_only_within_bounds(gain in -10.0f32..60.0) {
        let mut node = stopped_node();
        let before = node.preamp_gain();
        let in_bounds = (1.0..=40.0).contains(&gain);

        let result = node.set_preamp_gain(gain);
        prop_assert_eq!(result.is_ok(), in_bounds);
        if in_bounds {
            prop_assert_eq!(node.preamp_gain(), gain);
            prop_assert_eq!(node.port().input_gain(), gain);
        } else {
            prop_assert_eq!(node.preamp_gain(), before);
            prop_assert_eq!(node.port().input_gain(), before);
        }
    }
}

#[test]
fn preamp_gain_bounds_are_inclusive() {
    let mut node = stopped_node();
    node.set_preamp_gain(1.0).unwrap();
    node.set_preamp_gain(40.0).unwrap();
    assert!(node.set_preamp_gain(f32::NAN).is_err());
    assert_eq!(node.preamp_gain(), 40.0);
}
