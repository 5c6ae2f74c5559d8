//! Transport frame layout.
//!
//! Every frame row has `TRANSPORT_CHANNELS` 32-bit slots:
//!
//! | Channel | Content |
//! |---------|---------|
//! | 0..4 | passthrough payload |
//! | 4 | phase |
//! | 5 | depth |
//! | 6 | coherence |
//! | 7 | criticality (even sequence) / ICI [ms] (odd sequence) |
//!
//! The sequence number travels with the frame, so sender and receiver
//! apply the same parity rule to slot 7.

use serde::{Deserialize, Serialize};
use static_assertions::{const_assert, const_assert_eq};

use crate::node::metrics::{ActuationCommand, AnalysisFrame};

/// Slots per frame row.
pub const TRANSPORT_CHANNELS: usize = 8;
/// Payload channels at the start of each row.
pub const PAYLOAD_CHANNELS: usize = 4;
/// Channel of the first metric slot.
pub const METRIC_SLOT_BASE: usize = PAYLOAD_CHANNELS;
/// Number of metric slots.
pub const METRIC_SLOTS: usize = 4;
/// Bytes preceding the slots on the wire (sequence number).
pub const WIRE_HEADER_SIZE: usize = 4;

const_assert_eq!(METRIC_SLOT_BASE + METRIC_SLOTS, TRANSPORT_CHANNELS);
const_assert!(PAYLOAD_CHANNELS >= crate::consts::PASSTHROUGH_CHANNELS);

/// Metric slot within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MetricSlot {
    Phase = 0,
    Depth = 1,
    Coherence = 2,
    /// Criticality or ICI, by sequence parity.
    Aux = 3,
}

impl MetricSlot {
    /// Channel index of this slot in a row.
    #[inline]
    pub const fn channel(self) -> usize {
        METRIC_SLOT_BASE + self as usize
    }
}

/// Whether the aux slot of `sequence` carries criticality (even) or ICI (odd).
#[inline]
pub const fn aux_carries_criticality(sequence: u32) -> bool {
    sequence % 2 == 0
}

/// Scalar metrics exchanged between nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportMetrics {
    pub phase: f32,
    pub depth: f32,
    pub coherence: f32,
    pub criticality: f32,
    pub ici_ms: f32,
}

impl TransportMetrics {
    /// Metrics of one processing cycle.
    pub fn from_cycle(analysis: &AnalysisFrame, command: &ActuationCommand) -> Self {
        Self {
            phase: command.phase,
            depth: command.depth,
            coherence: analysis.coherence,
            criticality: analysis.criticality,
            ici_ms: analysis.ici_ms,
        }
    }
}

/// A pre-sized block of frame rows plus its sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFrame {
    sequence: u32,
    frames: usize,
    slots: Vec<i32>,
}

impl TransportFrame {
    /// Allocate a zeroed frame of `frames` rows (at least one).
    pub fn new(frames: usize) -> Self {
        let frames = frames.max(1);
        Self {
            sequence: 0,
            frames,
            slots: vec![0; frames * TRANSPORT_CHANNELS],
        }
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[inline]
    pub fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }

    /// Slot `channel` of row `frame`.
    #[inline]
    pub fn slot(&self, frame: usize, channel: usize) -> i32 {
        self.slots[frame * TRANSPORT_CHANNELS + channel]
    }

    #[inline]
    pub fn set_slot(&mut self, frame: usize, channel: usize, value: i32) {
        self.slots[frame * TRANSPORT_CHANNELS + channel] = value;
    }

    /// All slots, row-major.
    #[inline]
    pub fn slots(&self) -> &[i32] {
        &self.slots
    }

    #[inline]
    pub fn slots_mut(&mut self) -> &mut [i32] {
        &mut self.slots
    }

    /// Encoded size on the wire [bytes].
    #[inline]
    pub fn wire_len(&self) -> usize {
        WIRE_HEADER_SIZE + self.slots.len() * 4
    }

    /// Zero every slot and the sequence number.
    pub fn clear(&mut self) {
        self.sequence = 0;
        self.slots.fill(0);
    }
}
