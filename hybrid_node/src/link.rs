//! Inter-node transport link.
//!
//! Wraps the frame codec around a [`TransportPort`]. TX and RX frames and
//! their wire buffers are allocated once, at construction.
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `Disconnected` | nothing exchanged yet |
//! | `Syncing` | frames sent, none received |
//! | `Stable` | last receive in sequence |
//! | `Degraded` | a sequence gap was seen or the self-test failed |
//! | `Error` | the port failed |

use hybrid_common::consts::{
    DRIFT_WINDOW_US, SYNC_PULSE_HZ, TRANSPORT_JITTER_BUDGET_US, TRANSPORT_LATENCY_BUDGET_US,
};
use hybrid_common::hal::TransportPort;
use hybrid_common::transport::codec::{
    decode_into, encode_metrics, from_wire, read_payload, to_wire, write_payload,
};
use hybrid_common::transport::frame::{PAYLOAD_CHANNELS, aux_carries_criticality};
use hybrid_common::transport::{AuxMetric, DriftMeter, TransportError, TransportFrame, TransportMetrics};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Link health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    #[default]
    Disconnected,
    Syncing,
    Stable,
    Degraded,
    Error,
}

/// Link counters and timing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkStatistics {
    pub frames_transmitted: u64,
    pub frames_received: u64,
    /// Frames lost, from sequence gaps.
    pub frames_dropped: u64,
    /// Mean round trip of the last self-test [µs].
    pub latency_us: f64,
    /// Sample standard deviation of that round trip [µs].
    pub jitter_us: f64,
    pub drift_ppm: f32,
    pub status: LinkStatus,
}

/// Result of [`TransportLink::self_test`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub iterations: u32,
    /// Round trips that never came back.
    pub lost: u32,
    pub latency_us: f64,
    pub jitter_us: f64,
    /// Every decoded metric matched the sent bit pattern.
    pub bit_exact: bool,
    pub passed: bool,
}

/// Transport link to one peer.
pub struct TransportLink<T: TransportPort> {
    port: T,
    channels: usize,
    tx: TransportFrame,
    rx: TransportFrame,
    tx_wire: Vec<u8>,
    rx_wire: Vec<u8>,
    next_sequence: u32,
    expected_rx: Option<u32>,
    remote: TransportMetrics,
    drift: DriftMeter,
    stats: LinkStatistics,
}

impl<T: TransportPort> TransportLink<T> {
    /// Link exchanging `frames` rows with `channels` payload channels each.
    pub fn new(port: T, frames: usize, channels: usize) -> Result<Self, TransportError> {
        if channels > PAYLOAD_CHANNELS {
            return Err(TransportError::PayloadShape(format!(
                "{channels} channels exceed {PAYLOAD_CHANNELS} payload slots"
            )));
        }
        let tx = TransportFrame::new(frames);
        let wire_len = tx.wire_len();
        Ok(Self {
            port,
            channels,
            rx: tx.clone(),
            tx,
            tx_wire: vec![0; wire_len],
            rx_wire: vec![0; wire_len],
            next_sequence: 0,
            expected_rx: None,
            remote: TransportMetrics::default(),
            drift: DriftMeter::new(SYNC_PULSE_HZ, DRIFT_WINDOW_US),
            stats: LinkStatistics::default(),
        })
    }

    /// Send one frame of `payload` (interleaved, `frames × channels`) and
    /// `metrics`. Returns the sequence number used.
    pub fn transmit(
        &mut self,
        payload: &[f32],
        metrics: &TransportMetrics,
    ) -> Result<u32, TransportError> {
        let sequence = self.next_sequence;
        write_payload(&mut self.tx, payload, self.channels)?;
        encode_metrics(&mut self.tx, metrics, sequence);
        let n = to_wire(&self.tx, &mut self.tx_wire)?;
        if let Err(e) = self.port.send(&self.tx_wire[..n]) {
            self.stats.status = LinkStatus::Error;
            return Err(e.into());
        }
        self.next_sequence = sequence.wrapping_add(1);
        self.stats.frames_transmitted += 1;
        if self.stats.status == LinkStatus::Disconnected {
            self.stats.status = LinkStatus::Syncing;
        }
        Ok(sequence)
    }

    /// Receive one frame and fold its metrics into the remote view.
    ///
    /// Only the aux field the frame's parity selects is updated; the other
    /// keeps its last value.
    pub fn receive(&mut self) -> Result<AuxMetric, TransportError> {
        let n = match self.port.recv(&mut self.rx_wire) {
            Ok(n) => n,
            Err(e) => {
                self.stats.status = LinkStatus::Error;
                return Err(e.into());
            }
        };
        from_wire(&self.rx_wire[..n], &mut self.rx)?;
        let sequence = self.rx.sequence();
        if let Some(expected) = self.expected_rx {
            let gap = sequence.wrapping_sub(expected);
            if gap != 0 && gap < u32::MAX / 2 {
                self.stats.frames_dropped += gap as u64;
                self.stats.status = LinkStatus::Degraded;
                debug!("Transport gap: expected {expected}, got {sequence}");
            } else {
                self.stats.status = LinkStatus::Stable;
            }
        } else {
            self.stats.status = LinkStatus::Stable;
        }
        self.expected_rx = Some(sequence.wrapping_add(1));
        self.stats.frames_received += 1;
        Ok(decode_into(&self.rx, &mut self.remote))
    }

    /// Copy the last received payload into `out` (`frames × channels`).
    pub fn received_payload(&self, out: &mut [f32]) -> Result<(), TransportError> {
        read_payload(&self.rx, out, self.channels)
    }

    /// Feed the sync-pulse count; stores the drift when a window completes.
    pub fn update_drift(&mut self, pulse_count: u64, now_us: u64) -> Option<f32> {
        let ppm = self.drift.sample(pulse_count, now_us)?;
        self.stats.drift_ppm = ppm;
        Some(ppm)
    }

    /// Round-trip `iterations` frames through the port.
    ///
    /// Latency is the mean of the port-clock round trips, jitter their
    /// sample standard deviation. Passes iff nothing was lost, every decode
    /// was bit-exact, latency ≤ 40 µs and jitter ≤ 5 µs.
    pub fn self_test(&mut self, iterations: u32) -> Result<SelfTestReport, TransportError> {
        let iterations = iterations.max(1);
        let payload = vec![0.0f32; self.tx.frames() * self.channels];
        let mut count = 0u32;
        let mut mean = 0.0f64;
        let mut m2 = 0.0f64;
        let mut lost = 0u32;
        let mut bit_exact = true;

        for i in 0..iterations {
            let sent = TransportMetrics {
                phase: i as f32 * 0.01,
                depth: 0.5,
                coherence: 1.0 - i as f32 / iterations as f32,
                criticality: i as f32 * 0.125,
                ici_ms: 100.0 + i as f32,
            };
            let t0 = self.port.timestamp_us();
            let sequence = self.transmit(&payload, &sent)?;
            if self.receive().is_err() {
                lost += 1;
                continue;
            }
            let rtt = self.port.timestamp_us().saturating_sub(t0) as f64;

            bit_exact &= same_bits(&sent, &self.remote, sequence);

            count += 1;
            let delta = rtt - mean;
            mean += delta / count as f64;
            m2 += delta * (rtt - mean);
        }

        let jitter = if count > 1 {
            (m2 / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let passed = lost == 0
            && bit_exact
            && mean <= TRANSPORT_LATENCY_BUDGET_US
            && jitter <= TRANSPORT_JITTER_BUDGET_US;

        self.stats.latency_us = mean;
        self.stats.jitter_us = jitter;
        self.stats.status = if passed {
            LinkStatus::Stable
        } else {
            LinkStatus::Degraded
        };

        if passed {
            info!(
                "Transport self-test passed: {mean:.1} µs latency, {jitter:.2} µs jitter over {iterations} frames"
            );
        } else {
            warn!(
                "Transport self-test failed: {mean:.1} µs latency, {jitter:.2} µs jitter, {lost} lost, bit-exact {bit_exact}"
            );
        }

        Ok(SelfTestReport {
            iterations,
            lost,
            latency_us: mean,
            jitter_us: jitter,
            bit_exact,
            passed,
        })
    }

    /// Metrics last received from the peer.
    pub fn remote_metrics(&self) -> TransportMetrics {
        self.remote
    }

    pub fn statistics(&self) -> LinkStatistics {
        self.stats
    }

    pub fn status(&self) -> LinkStatus {
        self.stats.status
    }

    pub fn port_mut(&mut self) -> &mut T {
        &mut self.port
    }
}

fn same_bits(sent: &TransportMetrics, got: &TransportMetrics, sequence: u32) -> bool {
    let aux_matches = if aux_carries_criticality(sequence) {
        sent.criticality.to_bits() == got.criticality.to_bits()
    } else {
        sent.ici_ms.to_bits() == got.ici_ms.to_bits()
    };
    sent.phase.to_bits() == got.phase.to_bits()
        && sent.depth.to_bits() == got.depth.to_bits()
        && sent.coherence.to_bits() == got.coherence.to_bits()
        && aux_matches
}
