//! Metric and payload codec.
//!
//! Metric slots hold the IEEE-754 bit pattern of an `f32`, stored in an
//! `i32` slot. Decoding reinterprets the bits; there is no numeric
//! conversion, so a decode of an encoded frame is bit-exact.
//!
//! ## Wire format
//!
//! `[sequence: u32 LE][slot: i32 LE] × frames × TRANSPORT_CHANNELS`

use thiserror::Error;

use super::frame::{
    MetricSlot, PAYLOAD_CHANNELS, TransportFrame, TransportMetrics, WIRE_HEADER_SIZE,
    aux_carries_criticality,
};
use crate::hal::HalError;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Output byte buffer too small for the frame.
    #[error("wire buffer too small: need {needed} bytes, have {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// Received byte count does not match the frame shape.
    #[error("frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    /// Payload slice or channel count does not fit the frame.
    #[error("payload shape: {0}")]
    PayloadShape(String),

    /// Underlying transport port failed.
    #[error("transport port: {0}")]
    Port(#[from] HalError),
}

/// Value carried by the aux slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuxMetric {
    /// Even sequence.
    Criticality(f32),
    /// Odd sequence [ms].
    InterEventInterval(f32),
}

/// Metrics decoded from one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedMetrics {
    pub sequence: u32,
    pub phase: f32,
    pub depth: f32,
    pub coherence: f32,
    pub aux: AuxMetric,
}

/// Bit pattern of `value` as a slot.
#[inline]
pub const fn encode_f32(value: f32) -> i32 {
    value.to_bits() as i32
}

/// Reinterpret a slot as `f32`.
#[inline]
pub const fn decode_f32(slot: i32) -> f32 {
    f32::from_bits(slot as u32)
}

/// Encode `metrics` into every row of `frame` under `sequence`.
pub fn encode_metrics(frame: &mut TransportFrame, metrics: &TransportMetrics, sequence: u32) {
    let aux = if aux_carries_criticality(sequence) {
        metrics.criticality
    } else {
        metrics.ici_ms
    };
    let values = [
        encode_f32(metrics.phase),
        encode_f32(metrics.depth),
        encode_f32(metrics.coherence),
        encode_f32(aux),
    ];
    frame.set_sequence(sequence);
    for row in 0..frame.frames() {
        for (slot, value) in values.iter().enumerate() {
            frame.set_slot(row, MetricSlot::Phase.channel() + slot, *value);
        }
    }
}

/// Decode the metric slots of the first row.
pub fn decode_metrics(frame: &TransportFrame) -> DecodedMetrics {
    let sequence = frame.sequence();
    let read = |slot: MetricSlot| decode_f32(frame.slot(0, slot.channel()));
    let aux_value = read(MetricSlot::Aux);
    DecodedMetrics {
        sequence,
        phase: read(MetricSlot::Phase),
        depth: read(MetricSlot::Depth),
        coherence: read(MetricSlot::Coherence),
        aux: if aux_carries_criticality(sequence) {
            AuxMetric::Criticality(aux_value)
        } else {
            AuxMetric::InterEventInterval(aux_value)
        },
    }
}

/// Decode into `metrics`, updating only the field the aux slot carries.
pub fn decode_into(frame: &TransportFrame, metrics: &mut TransportMetrics) -> AuxMetric {
    let decoded = decode_metrics(frame);
    metrics.phase = decoded.phase;
    metrics.depth = decoded.depth;
    metrics.coherence = decoded.coherence;
    match decoded.aux {
        AuxMetric::Criticality(v) => metrics.criticality = v,
        AuxMetric::InterEventInterval(v) => metrics.ici_ms = v,
    }
    decoded.aux
}

/// Copy `channels` interleaved payload channels into the payload slots.
///
/// Payload channels beyond `channels` are zeroed.
pub fn write_payload(
    frame: &mut TransportFrame,
    payload: &[f32],
    channels: usize,
) -> Result<(), TransportError> {
    check_payload_shape(frame, payload.len(), channels)?;
    for row in 0..frame.frames() {
        for ch in 0..PAYLOAD_CHANNELS {
            let value = if ch < channels {
                encode_f32(payload[row * channels + ch])
            } else {
                0
            };
            frame.set_slot(row, ch, value);
        }
    }
    Ok(())
}

/// Copy the first `channels` payload slots of every row into `out`.
pub fn read_payload(
    frame: &TransportFrame,
    out: &mut [f32],
    channels: usize,
) -> Result<(), TransportError> {
    check_payload_shape(frame, out.len(), channels)?;
    for row in 0..frame.frames() {
        for ch in 0..channels {
            out[row * channels + ch] = decode_f32(frame.slot(row, ch));
        }
    }
    Ok(())
}

fn check_payload_shape(
    frame: &TransportFrame,
    len: usize,
    channels: usize,
) -> Result<(), TransportError> {
    if channels > PAYLOAD_CHANNELS {
        return Err(TransportError::PayloadShape(format!(
            "{channels} channels exceed {PAYLOAD_CHANNELS} payload slots"
        )));
    }
    if len < frame.frames() * channels {
        return Err(TransportError::PayloadShape(format!(
            "{len} samples for {} frames × {channels} channels",
            frame.frames()
        )));
    }
    Ok(())
}

/// Serialize `frame` into `out`; returns the number of bytes written.
pub fn to_wire(frame: &TransportFrame, out: &mut [u8]) -> Result<usize, TransportError> {
    let needed = frame.wire_len();
    if out.len() < needed {
        return Err(TransportError::BufferTooSmall {
            needed,
            actual: out.len(),
        });
    }
    out[..WIRE_HEADER_SIZE].copy_from_slice(&frame.sequence().to_le_bytes());
    for (chunk, slot) in out[WIRE_HEADER_SIZE..needed]
        .chunks_exact_mut(4)
        .zip(frame.slots())
    {
        chunk.copy_from_slice(&slot.to_le_bytes());
    }
    Ok(needed)
}

/// Deserialize `bytes` into `frame`; the byte count must match its shape.
pub fn from_wire(bytes: &[u8], frame: &mut TransportFrame) -> Result<(), TransportError> {
    let expected = frame.wire_len();
    if bytes.len() != expected {
        return Err(TransportError::FrameLength {
            expected,
            actual: bytes.len(),
        });
    }
    let mut seq = [0u8; WIRE_HEADER_SIZE];
    seq.copy_from_slice(&bytes[..WIRE_HEADER_SIZE]);
    frame.set_sequence(u32::from_le_bytes(seq));
    for (slot, chunk) in frame
        .slots_mut()
        .iter_mut()
        .zip(bytes[WIRE_HEADER_SIZE..].chunks_exact(4))
    {
        *slot = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metrics() -> TransportMetrics {
        TransportMetrics {
            phase: 0.618,
            depth: 0.42,
            coherence: 0.93,
            criticality: 1.37,
            ici_ms: 10.666667,
        }
    }

    #[test]
    fn even_sequence_carries_criticality() {
        let mut frame = TransportFrame::new(4);
        encode_metrics(&mut frame, &metrics(), 0);
        let d = decode_metrics(&frame);
        assert_eq!(d.sequence, 0);
        assert_eq!(d.phase.to_bits(), 0.618f32.to_bits());
        assert_eq!(d.depth.to_bits(), 0.42f32.to_bits());
        assert_eq!(d.coherence.to_bits(), 0.93f32.to_bits());
        assert_eq!(d.aux, AuxMetric::Criticality(1.37));
    }

    #[test]
    fn odd_sequence_carries_ici() {
        let mut frame = TransportFrame::new(4);
        encode_metrics(&mut frame, &metrics(), 1);
        assert_eq!(
            decode_metrics(&frame).aux,
            AuxMetric::InterEventInterval(10.666667)
        );
    }

    #[test]
    fn every_row_carries_metrics() {
        let mut frame = TransportFrame::new(3);
        encode_metrics(&mut frame, &metrics(), 2);
        for row in 0..3 {
            assert_eq!(
                frame.slot(row, MetricSlot::Depth.channel()),
                encode_f32(0.42)
            );
        }
    }

    #[test]
    fn decode_into_updates_only_parity_field() {
        let mut frame = TransportFrame::new(1);
        let mut rx = TransportMetrics {
            criticality: -1.0,
            ici_ms: -1.0,
            ..Default::default()
        };
        encode_metrics(&mut frame, &metrics(), 1);
        decode_into(&frame, &mut rx);
        assert_eq!(rx.ici_ms, 10.666667);
        assert_eq!(rx.criticality, -1.0);

        encode_metrics(&mut frame, &metrics(), 2);
        decode_into(&frame, &mut rx);
        assert_eq!(rx.criticality, 1.37);
    }

    #[test]
    fn payload_roundtrip_and_zero_fill() {
        let mut frame = TransportFrame::new(2);
        let payload = [0.5, -0.25, 0.125, -1.0];
        write_payload(&mut frame, &payload, 2).unwrap();
        assert_eq!(frame.slot(0, 2), 0);
        assert_eq!(frame.slot(1, 3), 0);
        let mut out = [0.0f32; 4];
        read_payload(&frame, &mut out, 2).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn payload_shape_errors() {
        let mut frame = TransportFrame::new(2);
        assert!(matches!(
            write_payload(&mut frame, &[0.0; 3], 2),
            Err(TransportError::PayloadShape(_))
        ));
        assert!(matches!(
            write_payload(&mut frame, &[0.0; 10], 5),
            Err(TransportError::PayloadShape(_))
        ));
    }

    #[test]
    fn wire_is_little_endian() {
        let mut frame = TransportFrame::new(1);
        encode_metrics(&mut frame, &metrics(), 0x0102_0304);
        frame.set_slot(0, 0, 0x0A0B_0C0D);
        let mut bytes = vec![0u8; frame.wire_len()];
        assert_eq!(to_wire(&frame, &mut bytes).unwrap(), 36);
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..8], &[0x0D, 0x0C, 0x0B, 0x0A]);

        let mut back = TransportFrame::new(1);
        from_wire(&bytes, &mut back).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn wire_length_checks() {
        let frame = TransportFrame::new(2);
        let mut small = [0u8; 10];
        assert_eq!(
            to_wire(&frame, &mut small),
            Err(TransportError::BufferTooSmall {
                needed: 68,
                actual: 10
            })
        );
        let mut rx = TransportFrame::new(2);
        assert_eq!(
            from_wire(&[0u8; 36], &mut rx),
            Err(TransportError::FrameLength {
                expected: 68,
                actual: 36
            })
        );
    }

    proptest! {
        #[test]
        fn metrics_survive_wire_bit_exact(
            bits in proptest::array::uniform5(any::<u32>()),
            sequence in any::<u32>(),
        ) {
            let m = TransportMetrics {
                phase: f32::from_bits(bits[0]),
                depth: f32::from_bits(bits[1]),
                coherence: f32::from_bits(bits[2]),
                criticality: f32::from_bits(bits[3]),
                ici_ms: f32::from_bits(bits[4]),
            };
            let mut tx = TransportFrame::new(2);
            encode_metrics(&mut tx, &m, sequence);
            let mut bytes = vec![0u8; tx.wire_len()];
            to_wire(&tx, &mut bytes).unwrap();
            let mut rx = TransportFrame::new(2);
            from_wire(&bytes, &mut rx).unwrap();
            let d = decode_metrics(&rx);
            prop_assert_eq!(d.sequence, sequence);
            prop_assert_eq!(d.phase.to_bits(), bits[0]);
            prop_assert_eq!(d.depth.to_bits(), bits[1]);
            prop_assert_eq!(d.coherence.to_bits(), bits[2]);
            let aux_bits = match d.aux {
                AuxMetric::Criticality(v) => { prop_assert!(sequence % 2 == 0); v.to_bits() }
                AuxMetric::InterEventInterval(v) => { prop_assert!(sequence % 2 == 1); v.to_bits() }
            };
            let expected = if sequence % 2 == 0 { bits[3] } else { bits[4] };
            prop_assert_eq!(aux_bits, expected);
        }
    }
}
