//! Integration test: conditioning, analysis and actuation across cycles.
//!
//! Each test feeds the node through its public `process` entry point with
//! either hand-built buffers or the simulation port's signal generator.

use hybrid_common::hal::HardwarePort;
use hybrid_common::node::config::{NodeConfig, OperatingMode};
use hybrid_common::node::metrics::ControlSetpoints;
use hybrid_common::node::state::SafetyState;
use hybrid_hal::backends::simulation::{SignalSource, SimulatedPort, SimulationSettings};
use hybrid_node::node::HybridNode;

const FRAMES: usize = 512;

// ── Helpers ─────────────────────────────────────────────────────────

fn running(config: NodeConfig, signal: SignalSource) -> HybridNode<SimulatedPort> {
    let settings = SimulationSettings {
        signal,
        ..Default::default()
    };
    let mut node = HybridNode::new(SimulatedPort::new(settings));
    node.init(config).unwrap();
    node.start().unwrap();
    node
}

/// One read → process → write round trip through the node's own port.
fn cycle(node: &mut HybridNode<SimulatedPort>) {
    let adc = node.config().adc_channels;
    let dac = node.config().dac_channels;
    let mut input = vec![0.0; FRAMES * adc];
    let mut output = vec![0.0; FRAMES * dac];
    node.port_mut().read(&mut input, FRAMES).unwrap();
    node.process(&input, &mut output, FRAMES).unwrap();
    node.port_mut().write(&output, FRAMES).unwrap();
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn silent_input_yields_quiet_metrics() {
    let config = NodeConfig {
        sample_rate: 48_000,
        buffer_size: FRAMES,
        adc_channels: 2,
        ..Default::default()
    };
    let mut node = running(config, SignalSource::Silence);
    let input = vec![0.0; FRAMES * 2];
    let mut output = vec![1.0; FRAMES * 4];

    let outcome = node.process(&input, &mut output, FRAMES).unwrap();

    let analog = node.analog();
    assert_eq!(analog.rms, 0.0);
    assert_eq!(analog.peak, 0.0);
    assert!(!analog.is_overloaded);

    let analysis = node.analysis();
    assert_eq!(analysis.spectral_centroid, 0.0);
    assert_eq!(analysis.spectral_flux, 0.0);
    assert_eq!(analysis.coherence, 1.0);
    assert_eq!(outcome.state, SafetyState::Ok);

    // Passthrough channels carry the silent input.
    for row in output.chunks_exact(4) {
        assert_eq!(row[0], 0.0);
        assert_eq!(row[1], 0.0);
    }
}

#[test]
fn analysis_sequence_counts_cycles() {
    let mut node = running(NodeConfig::default(), SignalSource::Silence);
    for expected in 1..=5u64 {
        let input = vec![0.0; FRAMES * 2];
        let mut output = vec![0.0; FRAMES * 4];
        let outcome = node.process(&input, &mut output, FRAMES).unwrap();
        assert_eq!(outcome.sequence, Some(expected - 1));
    }
    assert_eq!(node.statistics().frames_processed, 5);
}

#[test]
fn bin_aligned_tone_sets_centroid() {
    let config = NodeConfig {
        analysis_size: 2048,
        enable_analog_filter: false,
        ..Default::default()
    };
    let mut node = running(
        config,
        SignalSource::Sine {
            amplitude: 0.05,
            // Bin 43 of a 2048-point window at 48 kHz.
            frequency_hz: 1_007.812_5,
        },
    );
    // Fill the analysis window.
    for _ in 0..8 {
        cycle(&mut node);
    }
    let centroid = node.analysis().spectral_centroid;
    assert!(
        (centroid - 1_007.812_5).abs() < 25.0,
        "centroid {centroid} Hz for a 1007.8 Hz tone"
    );
    assert!(node.analog().rms > 0.3);
    assert!(!node.analog().is_overloaded);
}

#[test]
fn alternating_bursts_set_ici_to_cycle_length() {
    let config = NodeConfig {
        sample_rate: 48_000,
        buffer_size: FRAMES,
        analysis_size: FRAMES,
        enable_analog_filter: false,
        ..Default::default()
    };
    let mut node = running(config, SignalSource::Silence);
    // 3 kHz lands on bin 32 of a 512-point window.
    let burst: Vec<f32> = (0..FRAMES)
        .flat_map(|i| {
            let v = (2.0 * std::f32::consts::PI * 3_000.0 * i as f32 / 48_000.0).sin() * 0.05;
            [v, v]
        })
        .collect();
    let silence = vec![0.0; FRAMES * 2];
    let mut output = vec![0.0; FRAMES * 4];

    node.process(&burst, &mut output, FRAMES).unwrap();
    assert_eq!(node.analysis().ici_ms, 100.0);

    let cycle_ms = FRAMES as f32 / 48_000.0 * 1_000.0;
    for n in 1..6 {
        let input = if n % 2 == 0 { &burst } else { &silence };
        node.process(input, &mut output, FRAMES).unwrap();
        let analysis = node.analysis();
        assert!(analysis.spectral_flux > 0.5, "cycle {n}");
        assert!((analysis.ici_ms - cycle_ms).abs() < 1e-3, "ici {}", analysis.ici_ms);
    }
    // Rate saturates for any ICI up to one second: 1 × 5 V × 0.8.
    assert!((node.command().cv2 - 4.0).abs() < 1e-6);
    assert!(output.chunks_exact(4).all(|row| (row[3] - 4.0).abs() < 1e-6));
}

#[test]
fn high_pass_removes_dc_over_time() {
    let mut node = running(NodeConfig::default(), SignalSource::Dc { level: 0.05 });
    cycle(&mut node);
    let first = node.analog().dc_offset.abs();
    for _ in 0..50 {
        cycle(&mut node);
    }
    let settled = node.analog().dc_offset.abs();
    assert!(first > settled);
    assert!(settled < 1e-3, "residual DC {settled}");
}

#[test]
fn analog_only_holds_manual_voltages() {
    let config = NodeConfig {
        mode: OperatingMode::AnalogOnly,
        ..Default::default()
    };
    let mut node = running(config, SignalSource::Silence);
    node.set_control_setpoints(ControlSetpoints {
        cv1: 1.25,
        cv2: 3.5,
        ..Default::default()
    })
    .unwrap();

    let input = vec![0.0; FRAMES * 2];
    let mut output = vec![0.0; FRAMES * 4];
    let outcome = node.process(&input, &mut output, FRAMES).unwrap();

    assert_eq!(outcome.sequence, None);
    for row in output.chunks_exact(4) {
        assert_eq!(row[2], 1.25);
        assert_eq!(row[3], 3.5);
    }
}

#[test]
fn dsp_only_mutes_passthrough() {
    let config = NodeConfig {
        mode: OperatingMode::DspOnly,
        enable_analog_filter: false,
        ..Default::default()
    };
    let mut node = running(config, SignalSource::Silence);
    let input = vec![0.25; FRAMES * 2];
    let mut output = vec![1.0; FRAMES * 4];
    let outcome = node.process(&input, &mut output, FRAMES).unwrap();

    assert!(outcome.sequence.is_some());
    for row in output.chunks_exact(4) {
        assert_eq!(row[0], 0.0);
        assert_eq!(row[1], 0.0);
    }
    // Default ICI of 100 ms saturates the rate channel: 1 × 5 V × 0.8.
    assert!((node.command().cv2 - 4.0).abs() < 1e-6);
}

#[test]
fn full_depth_reaches_voltage_ceiling() {
    let config = NodeConfig {
        modulation_depth: 1.0,
        ..Default::default()
    };
    let mut node = running(config, SignalSource::Silence);
    node.set_control_setpoints(ControlSetpoints {
        depth: 1.0,
        ..Default::default()
    })
    .unwrap();

    let input = vec![0.0; FRAMES * 2];
    let mut output = vec![0.0; FRAMES * 4];
    let outcome = node.process(&input, &mut output, FRAMES).unwrap();

    assert_eq!(outcome.state, SafetyState::VoltageClamp);
    assert_eq!(node.safety().clamp_count, 1);
    assert_eq!(node.command().cv1, 5.0);
    assert!(output.chunks_exact(4).all(|row| row[2] <= 5.0 && row[3] <= 5.0));
}
