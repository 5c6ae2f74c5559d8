//! Integration test: the auxiliary sensor front-end driven as an
//! application would, independent of the audio cycle.
//!
//! 1. Range calibration over a sweep, then normalized readings
//! 2. Malformed readings are dropped and counted

use hybrid_common::consts::SENSOR_ADC_MAX;
use hybrid_common::node::error::NodeError;
use hybrid_node::acquisition::{SensorFrontEnd, code_to_voltage};

#[test]
fn calibrated_sweep_normalizes_to_unit_range() {
    let mut sensors = SensorFrontEnd::new(2, false).unwrap();
    let low: &[u16] = &[1_000, 500];
    let high: &[u16] = &[3_000, 2_500];
    let range = sensors.calibrate_range(&[low, high]).unwrap();
    assert_eq!(range.samples, 2);
    assert_eq!(range.v_min[0], code_to_voltage(1_000));
    assert_eq!(range.v_max[1], code_to_voltage(2_500));

    let frame = sensors.convert(&[2_000, 2_500], 42).unwrap();
    assert_eq!(frame.len(), 2);
    assert!((frame[0].normalized - 0.5).abs() < 1e-4);
    assert!((frame[1].normalized - 1.0).abs() < 1e-6);
    assert!(frame.iter().all(|s| s.timestamp_us == 42));

    // Outside the measured range the value is held at the bounds.
    let frame = sensors.convert(&[0, SENSOR_ADC_MAX], 43).unwrap();
    assert_eq!(frame[0].normalized, 0.0);
    assert_eq!(frame[1].normalized, 1.0);
    assert_eq!(sensors.statistics().total_samples, 2);
}

#[test]
fn wrong_width_reading_is_dropped() {
    let mut sensors = SensorFrontEnd::new(4, true).unwrap();
    let err = sensors.convert(&[100, 200], 0).unwrap_err();
    assert!(matches!(err, NodeError::InvalidArgument(_)));
    assert_eq!(sensors.statistics().dropped_samples, 1);
    assert_eq!(sensors.statistics().total_samples, 0);

    sensors.convert(&[0; 4], 1).unwrap();
    assert_eq!(sensors.statistics().total_samples, 1);
}
