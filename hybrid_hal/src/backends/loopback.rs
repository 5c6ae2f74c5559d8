//! In-memory transport loopback.
//!
//! `send` stores a frame, `recv` hands it back. The link clock is virtual:
//! every `recv` advances it by the next entry of a cycling latency pattern,
//! so round-trip statistics are deterministic.

use hybrid_common::hal::{HalError, TransportPort};

/// Loopback implementing `TransportPort`.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    buffer: Vec<u8>,
    pending: Option<usize>,
    latency_pattern: Vec<u64>,
    next_latency: usize,
    now_us: u64,
    /// Discard every n-th sent frame (0 = never).
    drop_every: u32,
    sent: u32,
}

impl LoopbackTransport {
    /// Loopback with a constant round-trip latency [µs].
    pub fn new(latency_us: u64) -> Self {
        Self::with_pattern(vec![latency_us])
    }

    /// Loopback cycling through `pattern` [µs]; an empty pattern means zero latency.
    pub fn with_pattern(pattern: Vec<u64>) -> Self {
        Self {
            buffer: Vec::new(),
            pending: None,
            latency_pattern: pattern,
            next_latency: 0,
            now_us: 0,
            drop_every: 0,
            sent: 0,
        }
    }

    /// Silently lose every n-th frame.
    pub fn drop_every(mut self, n: u32) -> Self {
        self.drop_every = n;
        self
    }

    fn step_latency(&mut self) -> u64 {
        if self.latency_pattern.is_empty() {
            return 0;
        }
        let l = self.latency_pattern[self.next_latency % self.latency_pattern.len()];
        self.next_latency = self.next_latency.wrapping_add(1);
        l
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TransportPort for LoopbackTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), HalError> {
        self.sent = self.sent.wrapping_add(1);
        if self.drop_every > 0 && self.sent % self.drop_every == 0 {
            return Ok(());
        }
        if self.buffer.len() < bytes.len() {
            self.buffer.resize(bytes.len(), 0);
        }
        self.buffer[..bytes.len()].copy_from_slice(bytes);
        self.pending = Some(bytes.len());
        Ok(())
    }

    fn recv(&mut self, bytes: &mut [u8]) -> Result<usize, HalError> {
        let len = self
            .pending
            .take()
            .ok_or_else(|| HalError::ReadFailed("no frame pending".into()))?;
        if bytes.len() < len {
            return Err(HalError::ReadFailed(format!(
                "receive buffer {} < frame {len}",
                bytes.len()
            )));
        }
        bytes[..len].copy_from_slice(&self.buffer[..len]);
        let latency = self.step_latency();
        self.now_us = self.now_us.saturating_add(latency);
        Ok(len)
    }

    fn timestamp_us(&mut self) -> u64 {
        self.now_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_comes_back() {
        let mut t = LoopbackTransport::new(12);
        t.send(&[1, 2, 3]).unwrap();
        let t0 = t.timestamp_us();
        let mut buf = [0u8; 8];
        assert_eq!(t.recv(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(t.timestamp_us() - t0, 12);
        assert!(t.recv(&mut buf).is_err());
    }

    #[test]
    fn latency_pattern_cycles() {
        let mut t = LoopbackTransport::with_pattern(vec![10, 30]);
        let mut buf = [0u8; 1];
        let mut seen = Vec::new();
        for _ in 0..4 {
            t.send(&[0]).unwrap();
            let t0 = t.timestamp_us();
            t.recv(&mut buf).unwrap();
            seen.push(t.timestamp_us() - t0);
        }
        assert_eq!(seen, vec![10, 30, 10, 30]);
    }

    #[test]
    fn dropped_frames_never_arrive() {
        let mut t = LoopbackTransport::new(0).drop_every(2);
        let mut buf = [0u8; 1];
        t.send(&[1]).unwrap();
        assert!(t.recv(&mut buf).is_ok());
        t.send(&[2]).unwrap();
        assert!(t.recv(&mut buf).is_err());
    }

    #[test]
    fn short_receive_buffer_fails() {
        let mut t = LoopbackTransport::new(0);
        t.send(&[0; 16]).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(t.recv(&mut buf), Err(HalError::ReadFailed(_))));
    }
}
