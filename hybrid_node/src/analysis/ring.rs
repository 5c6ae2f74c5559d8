//! Fixed-capacity circular history of spectral flux values.

use hybrid_common::consts::ICI_RING_CAPACITY;

/// Ring of the last [`ICI_RING_CAPACITY`] flux values.
///
/// Unwritten slots hold 0.0, which is never a peak for a non-negative
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxRing {
    slots: [f32; ICI_RING_CAPACITY],
    head: usize,
    len: usize,
}

impl FluxRing {
    pub const CAPACITY: usize = ICI_RING_CAPACITY;

    pub const fn new() -> Self {
        Self {
            slots: [0.0; ICI_RING_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    /// Append, overwriting the oldest entry once full.
    #[inline]
    pub fn push(&mut self, value: f32) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % Self::CAPACITY;
        if self.len < Self::CAPACITY {
            self.len += 1;
        }
    }

    /// Entries written so far, at most the capacity.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        let start = (self.head + Self::CAPACITY - self.len) % Self::CAPACITY;
        (0..self.len).map(move |i| self.slots[(start + i) % Self::CAPACITY])
    }

    /// Number of entries strictly above `threshold`.
    #[inline]
    pub fn count_above(&self, threshold: f32) -> usize {
        self.iter().filter(|&v| v > threshold).count()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for FluxRing {
    fn default() -> Self {
        Self::new()
    }
}
