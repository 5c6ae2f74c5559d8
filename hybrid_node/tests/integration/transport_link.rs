//! Integration test: node metrics over the transport link.
//!
//! A running node's cycle output is sent through a loopback transport and
//! decoded on the other side, and the link self-test is checked against
//! its latency and jitter budgets.

use hybrid_common::node::config::NodeConfig;
use hybrid_common::transport::{AuxMetric, TransportMetrics};
use hybrid_hal::backends::loopback::LoopbackTransport;
use hybrid_hal::backends::simulation::SimulatedPort;
use hybrid_node::link::{LinkStatus, TransportLink};
use hybrid_node::node::HybridNode;
use proptest::prelude::*;

const FRAMES: usize = 64;

fn sample_metrics() -> TransportMetrics {
    TransportMetrics {
        phase: 0.25,
        depth: 0.75,
        coherence: 0.5,
        criticality: 0.125,
        ici_ms: 42.0,
    }
}

#[test]
fn cycle_output_crosses_the_link() {
    let config = NodeConfig {
        buffer_size: FRAMES,
        enable_analog_filter: false,
        ..Default::default()
    };
    let mut node = HybridNode::new(SimulatedPort::default());
    node.init(config).unwrap();
    node.start().unwrap();

    let input: Vec<f32> = (0..FRAMES * 2).map(|i| (i as f32 * 0.01).sin() * 0.1).collect();
    let mut output = vec![0.0; FRAMES * 4];
    node.process(&input, &mut output, FRAMES).unwrap();

    // Passthrough channels 0 and 1 of the actuation buffer.
    let payload: Vec<f32> = output
        .chunks_exact(4)
        .flat_map(|row| [row[0], row[1]])
        .collect();
    let sent = TransportMetrics::from_cycle(&node.analysis(), &node.command());

    let mut link = TransportLink::new(LoopbackTransport::new(10), FRAMES, 2).unwrap();
    assert_eq!(link.transmit(&payload, &sent).unwrap(), 0);
    let aux = link.receive().unwrap();

    assert_eq!(aux, AuxMetric::Criticality(sent.criticality));
    let remote = link.remote_metrics();
    assert_eq!(remote.coherence.to_bits(), sent.coherence.to_bits());
    assert_eq!(remote.depth.to_bits(), sent.depth.to_bits());

    let mut received = vec![0.0; FRAMES * 2];
    link.received_payload(&mut received).unwrap();
    assert!(received.iter().zip(&payload).all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn aux_slot_alternates_with_sequence_parity() {
    let mut link = TransportLink::new(LoopbackTransport::new(0), 4, 2).unwrap();
    let payload = [0.0; 8];
    let metrics = sample_metrics();

    assert_eq!(link.transmit(&payload, &metrics).unwrap(), 0);
    assert_eq!(link.receive().unwrap(), AuxMetric::Criticality(0.125));

    assert_eq!(link.transmit(&payload, &metrics).unwrap(), 1);
    assert_eq!(link.receive().unwrap(), AuxMetric::InterEventInterval(42.0));

    let remote = link.remote_metrics();
    assert_eq!(remote.criticality, 0.125);
    assert_eq!(remote.ici_ms, 42.0);
    assert_eq!(link.status(), LinkStatus::Stable);
}

#[test]
fn self_test_within_budgets_passes() {
    // Alternating 36/44 µs: mean 40, sample deviation ~4.02.
    let mut link = TransportLink::new(LoopbackTransport::with_pattern(vec![36, 44]), 16, 2).unwrap();
    let report = link.self_test(100).unwrap();
    assert!((report.latency_us - 40.0).abs() < 1e-9);
    assert!(report.jitter_us > 4.0 && report.jitter_us < 4.1);
    assert!(report.bit_exact);
    assert!(report.passed);
    assert_eq!(link.statistics().status, LinkStatus::Stable);
}

#[test]
fn self_test_over_jitter_budget_fails() {
    let mut link = TransportLink::new(LoopbackTransport::with_pattern(vec![30, 50]), 16, 2).unwrap();
    let report = link.self_test(100).unwrap();
    assert!((report.latency_us - 40.0).abs() < 1e-9);
    assert!(report.jitter_us > 5.0);
    assert!(!report.passed);
    assert_eq!(link.status(), LinkStatus::Degraded);
}

#[test]
fn drift_window_reports_ppm() {
    let mut link = TransportLink::new(LoopbackTransport::new(0), 4, 2).unwrap();
    assert_eq!(link.update_drift(0, 0), None);
    assert_eq!(link.update_drift(500, 500_000), None);
    // 1001 pulses in one second at 1 kHz: +1000 ppm.
    let ppm = link.update_drift(1_001, 1_000_000).unwrap();
    assert!((ppm - 1_000.0).abs() < 1e-3);
    assert!((link.statistics().drift_ppm - 1_000.0).abs() < 1e-3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Any bit pattern, NaN payloads included, survives the link unchanged.
    #[test]
    fn metrics_survive_the_link_bit_exact(bits in proptest::array::uniform5(any::<u32>())) {
        let sent = TransportMetrics {
            phase: f32::from_bits(bits[0]),
            depth: f32::from_bits(bits[1]),
            coherence: f32::from_bits(bits[2]),
            criticality: f32::from_bits(bits[3]),
            ici_ms: f32::from_bits(bits[4]),
        };
        let mut link = TransportLink::new(LoopbackTransport::new(0), 2, 1).unwrap();
        let payload = [f32::from_bits(bits[0]), f32::from_bits(bits[4])];

        link.transmit(&payload, &sent).unwrap();
        link.receive().unwrap();
        link.transmit(&payload, &sent).unwrap();
        link.receive().unwrap();

        let remote = link.remote_metrics();
        prop_assert_eq!(remote.phase.to_bits(), bits[0]);
        prop_assert_eq!(remote.depth.to_bits(), bits[1]);
        prop_assert_eq!(remote.coherence.to_bits(), bits[2]);
        prop_assert_eq!(remote.criticality.to_bits(), bits[3]);
        prop_assert_eq!(remote.ici_ms.to_bits(), bits[4]);

        let mut received = [0.0f32; 2];
        link.received_payload(&mut received).unwrap();
        prop_assert_eq!(received[0].to_bits(), bits[0]);
        prop_assert_eq!(received[1].to_bits(), bits[4]);
    }
}
