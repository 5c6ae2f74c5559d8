//! Hardware port traits and error types.
//!
//! This module defines:
//! - `HardwarePort` trait - sample I/O, preamp gain and sensors of one node
//! - `TransportPort` trait - raw frame exchange between nodes
//! - `HalError` enum - error types for port operations
//! - `PortLayout` struct - buffer shape negotiated at init

use thiserror::Error;

/// Error types for port operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// Port initialization failed.
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Input transfer failed.
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Output transfer failed.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// A sensor or control (thermal input, preamp) is not present.
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// No backend registered under that name.
    #[error("Backend not found: {0}")]
    BackendNotFound(String),
}

/// Interleaved buffer shape used by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortLayout {
    pub sample_rate: u32,
    /// Frames per transfer.
    pub buffer_size: usize,
    pub adc_channels: usize,
    pub dac_channels: usize,
}

impl PortLayout {
    /// Samples in one full input buffer.
    #[inline]
    pub const fn input_len(&self) -> usize {
        self.buffer_size * self.adc_channels
    }

    /// Samples in one full output buffer.
    #[inline]
    pub const fn output_len(&self) -> usize {
        self.buffer_size * self.dac_channels
    }
}

/// Monotonic time since an arbitrary origin [µs].
///
/// Reads `CLOCK_MONOTONIC`; returns 0 if the clock is unavailable.
pub fn monotonic_us() -> u64 {
    use nix::time::{ClockId, clock_gettime};
    clock_gettime(ClockId::CLOCK_MONOTONIC)
        .map(|ts| ts.tv_sec() as u64 * 1_000_000 + ts.tv_nsec() as u64 / 1_000)
        .unwrap_or(0)
}

/// Sample I/O of one processing node.
///
/// # Lifecycle
///
/// 1. `init()` - called by `HybridNode::init` before any transfer
/// 2. `read()` / `write()` - once per cycle
/// 3. `shutdown()` - when the node is dropped or re-initialized
///
/// # Timing Contracts
///
/// | Operation | Max Duration | RT Constraint |
/// |-----------|--------------|---------------|
/// | `init()` | unbounded | None (pre-RT) |
/// | `read()` / `write()` | part of one buffer duration | **HARD** |
/// | `set_input_gain()` | bounded | soft |
/// | `read_temperature()` | bounded | soft |
///
/// A blocking read or write is a deadline violation and is reported by the
/// node as such, not masked.
pub trait HardwarePort: Send {
    /// Backend identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Prepare the port for the given buffer shape.
    fn init(&mut self, layout: &PortLayout) -> Result<(), HalError>;

    /// Release the hardware.
    fn shutdown(&mut self) -> Result<(), HalError>;

    /// Fill `buffer[..frames * adc_channels]` with interleaved input samples.
    fn read(&mut self, buffer: &mut [f32], frames: usize) -> Result<(), HalError>;

    /// Emit `buffer[..frames * dac_channels]` interleaved output samples.
    fn write(&mut self, buffer: &[f32], frames: usize) -> Result<(), HalError>;

    /// Set the analog preamp gain (linear).
    fn set_input_gain(&mut self, gain: f32) -> Result<(), HalError>;

    /// Read a temperature sensor [°C].
    fn read_temperature(&mut self, channel: u8) -> Result<f32, HalError> {
        Err(HalError::SensorUnavailable(format!(
            "no thermal sensor on channel {channel}"
        )))
    }

    /// Port clock [µs], used to timestamp transfers and measure latency.
    fn timestamp_us(&mut self) -> u64 {
        monotonic_us()
    }
}

impl<P: HardwarePort + ?Sized> HardwarePort for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn init(&mut self, layout: &PortLayout) -> Result<(), HalError> {
        (**self).init(layout)
    }
    fn shutdown(&mut self) -> Result<(), HalError> {
        (**self).shutdown()
    }
    fn read(&mut self, buffer: &mut [f32], frames: usize) -> Result<(), HalError> {
        (**self).read(buffer, frames)
    }
    fn write(&mut self, buffer: &[f32], frames: usize) -> Result<(), HalError> {
        (**self).write(buffer, frames)
    }
    fn set_input_gain(&mut self, gain: f32) -> Result<(), HalError> {
        (**self).set_input_gain(gain)
    }
    fn read_temperature(&mut self, channel: u8) -> Result<f32, HalError> {
        (**self).read_temperature(channel)
    }
    fn timestamp_us(&mut self) -> u64 {
        (**self).timestamp_us()
    }
}

/// Raw frame exchange with a peer node.
pub trait TransportPort: Send {
    /// Send one encoded frame.
    fn send(&mut self, bytes: &[u8]) -> Result<(), HalError>;

    /// Receive one encoded frame into `bytes`; returns its length.
    fn recv(&mut self, bytes: &mut [u8]) -> Result<usize, HalError>;

    /// Link clock [µs].
    fn timestamp_us(&mut self) -> u64 {
        monotonic_us()
    }
}
