//! Integration test: safety interlocks over consecutive cycles.
//!
//! 1. Sustained overload → gain reduced ×0.9 per cycle down to `gain_min`
//! 2. Warning temperature → advisory state, cleared when it cools down
//! 3. Critical temperature → emergency shutdown inside the cycle
//! 4. Consecutive deadline misses → fault after the escalation limit

use hybrid_common::node::config::NodeConfig;
use hybrid_common::node::error::SafetyFlags;
use hybrid_common::node::metrics::ControlSetpoints;
use hybrid_common::node::state::{NodeLifecycle, SafetyState};
use hybrid_hal::backends::simulation::{SimulatedPort, SimulationSettings};
use hybrid_node::node::HybridNode;
use hybrid_node::safety::ShutdownCause;

const FRAMES: usize = 512;

// ── Helpers ─────────────────────────────────────────────────────────

fn running(config: NodeConfig, settings: SimulationSettings) -> HybridNode<SimulatedPort> {
    let mut node = HybridNode::new(SimulatedPort::new(settings));
    node.init(config).unwrap();
    node.start().unwrap();
    node
}

fn thermal_config() -> NodeConfig {
    NodeConfig {
        enable_thermal_monitor: true,
        ..Default::default()
    }
}

fn buffers(level: f32) -> (Vec<f32>, Vec<f32>) {
    (vec![level; FRAMES * 2], vec![0.0; FRAMES * 4])
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn sustained_overload_walks_gain_down_to_floor() {
    let config = NodeConfig {
        enable_analog_filter: false,
        ..Default::default()
    };
    let mut node = running(config, SimulationSettings::default());
    let (input, mut output) = buffers(0.99);

    let mut expected = 10.0f32;
    for cycle in 1..=30u64 {
        let outcome = node.process(&input, &mut output, FRAMES).unwrap();
        assert!(outcome.flags.contains(SafetyFlags::OVERLOAD));
        assert_eq!(outcome.state, SafetyState::Overload);
        assert_eq!(node.safety().overload_count, cycle);

        if expected > 1.0 {
            expected = (expected * 0.9).max(1.0);
        }
        assert_eq!(node.preamp_gain(), expected, "cycle {cycle}");
        assert_eq!(node.port().input_gain(), expected);
    }
    assert_eq!(node.preamp_gain(), 1.0);
    // Overload alone never stops the node.
    assert!(node.is_running());
}

#[test]
fn overload_clears_when_level_drops() {
    let config = NodeConfig {
        enable_analog_filter: false,
        ..Default::default()
    };
    let mut node = running(config, SimulationSettings::default());
    let (hot, mut output) = buffers(0.99);
    let (quiet, _) = buffers(0.1);

    node.process(&hot, &mut output, FRAMES).unwrap();
    assert_eq!(node.safety().state, SafetyState::Overload);

    let outcome = node.process(&quiet, &mut output, FRAMES).unwrap();
    assert!(!outcome.flags.contains(SafetyFlags::OVERLOAD));
    assert_eq!(outcome.state, SafetyState::Ok);
    assert!(node.safety().sticky_flags().contains(SafetyFlags::OVERLOAD));
}

#[test]
fn clamp_in_the_same_cycle_reports_voltage_clamp() {
    // Full modulation depth puts the rate output at V_max for any ICI
    // up to one second.
    let config = NodeConfig {
        enable_analog_filter: false,
        modulation_depth: 1.0,
        ..Default::default()
    };
    let mut node = running(config, SimulationSettings::default());
    let (input, mut output) = buffers(0.99);

    let outcome = node.process(&input, &mut output, FRAMES).unwrap();
    assert!(outcome
        .flags
        .contains(SafetyFlags::OVERLOAD | SafetyFlags::VOLTAGE_CLAMP));
    assert_eq!(outcome.state, SafetyState::VoltageClamp);
    assert_eq!(node.safety().overload_count, 1);
    assert_eq!(node.safety().clamp_count, 1);
    // The overload still reduces the preamp.
    assert_eq!(node.preamp_gain(), 9.0);
    assert!(node.is_running());
}

#[test]
fn thermal_warning_is_advisory() {
    let mut node = running(thermal_config(), SimulationSettings::default());
    let (input, mut output) = buffers(0.0);

    node.port_mut().set_temperature(75.0);
    let outcome = node.process(&input, &mut output, FRAMES).unwrap();
    assert!(outcome.flags.contains(SafetyFlags::THERMAL_WARNING));
    assert_eq!(outcome.state, SafetyState::ThermalWarning);
    assert!(outcome.shutdown.is_none());
    assert!(node.safety().thermal_warning);

    node.port_mut().set_temperature(40.0);
    let outcome = node.process(&input, &mut output, FRAMES).unwrap();
    assert_eq!(outcome.state, SafetyState::Ok);
    // The advisory latch survives until an operator reset.
    assert!(node.safety().thermal_warning);
    node.reset_safety();
    assert!(!node.safety().thermal_warning);
}

#[test]
fn thermal_critical_shuts_down_within_the_cycle() {
    let mut node = running(thermal_config(), SimulationSettings::default());
    let (input, mut output) = buffers(0.3);
    node.set_control_setpoints(ControlSetpoints {
        depth: 0.5,
        ..Default::default()
    })
    .unwrap();

    node.port_mut().set_temperature(90.0);
    output.fill(1.0);
    let outcome = node.process(&input, &mut output, FRAMES).unwrap();

    assert_eq!(outcome.shutdown, Some(ShutdownCause::ThermalCritical));
    assert!(outcome.flags.contains(SafetyFlags::THERMAL_CRITICAL | SafetyFlags::SHUTDOWN));
    assert_eq!(node.lifecycle(), NodeLifecycle::Stopped);
    assert_eq!(node.safety().state, SafetyState::ThermalCritical);
    assert!(output.iter().all(|&v| v == 0.0));
    assert_eq!(node.command().cv1, 0.0);

    // Refused until restarted.
    assert!(node.process(&input, &mut output, FRAMES).is_err());
}

#[test]
fn deadline_misses_escalate_to_fault() {
    let config = NodeConfig {
        deadline_escalation_limit: 3,
        ..Default::default()
    };
    // 512 frames at 48 kHz leave 10 666 µs; every cycle takes 20 ms.
    let settings = SimulationSettings {
        clock_step_us: 20_000,
        ..Default::default()
    };
    let mut node = running(config, settings);
    let (input, mut output) = buffers(0.0);

    for miss in 1..3u32 {
        let outcome = node.process(&input, &mut output, FRAMES).unwrap();
        assert!(outcome.flags.contains(SafetyFlags::DEADLINE_MISS));
        assert!(outcome.shutdown.is_none());
        assert_eq!(node.safety().consecutive_deadline_misses, miss);
        assert!(node.is_running());
    }

    let outcome = node.process(&input, &mut output, FRAMES).unwrap();
    assert_eq!(outcome.shutdown, Some(ShutdownCause::DeadlineEscalation));
    assert_eq!(node.safety().state, SafetyState::Fault);
    assert_eq!(node.safety().deadline_misses, 3);
    assert_eq!(node.statistics().deadline_misses, 3);
    assert!(!node.is_running());
}

#[test]
fn isolated_deadline_miss_is_recorded_only() {
    let mut node = running(NodeConfig::default(), SimulationSettings::default());
    let (input, mut output) = buffers(0.0);

    node.port_mut().clock_mut().set_step(20_000);
    let outcome = node.process(&input, &mut output, FRAMES).unwrap();
    assert!(outcome.flags.contains(SafetyFlags::DEADLINE_MISS));
    assert_eq!(outcome.state, SafetyState::Ok);

    node.port_mut().clock_mut().set_step(0);
    node.process(&input, &mut output, FRAMES).unwrap();
    assert_eq!(node.safety().consecutive_deadline_misses, 0);
    assert_eq!(node.safety().deadline_misses, 1);
    assert!(node.is_running());
}
