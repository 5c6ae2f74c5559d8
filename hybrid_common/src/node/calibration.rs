//! Calibration profile and its fixed-size binary record.
//!
//! ## Record layout (little-endian, 168 bytes)
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0   | 4   | magic `HNCP` |
//! | 4   | 2   | record version |
//! | 6   | 1   | input channels |
//! | 7   | 1   | output channels |
//! | 8   | 4   | revision |
//! | 12  | 8   | created_at [s since epoch] |
//! | 20  | 16  | total / acquisition / analysis / actuation latency [µs] |
//! | 36  | 1   | valid flag |
//! | 37  | 3   | reserved (zero) |
//! | 40  | 128 | input offset, input gain, output gain, output offset (`f32` × 8 each) |
//!
//! Floats are stored as their IEEE-754 bit pattern, so a save/load round
//! trip is bit-exact (NaN payloads included).

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::consts::MAX_CHANNELS;

/// Record magic.
pub const RECORD_MAGIC: [u8; 4] = *b"HNCP";
/// Current record version.
pub const RECORD_VERSION: u16 = 1;

const HEADER_SIZE: usize = 4 + 2 + 1 + 1 + 4 + 8;
const LATENCY_SIZE: usize = 4 * 4;
const FLAG_SIZE: usize = 4;
const TABLE_SIZE: usize = 4 * MAX_CHANNELS * 4;

/// Size of one encoded profile [bytes].
pub const RECORD_SIZE: usize = HEADER_SIZE + LATENCY_SIZE + FLAG_SIZE + TABLE_SIZE;

const_assert_eq!(RECORD_SIZE, 168);

/// Calibration record and routine errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// Fewer bytes than one record.
    #[error("calibration record truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("calibration record has bad magic")]
    BadMagic,

    #[error("unsupported calibration record version {0}")]
    UnsupportedVersion(u16),

    /// No valid profile to save or use.
    #[error("node is not calibrated")]
    NotCalibrated,

    /// Calibration aborted by the port or an invalid measurement.
    #[error("calibration failed: {0}")]
    Failed(String),

    #[error("calibration file I/O: {0}")]
    Io(String),
}

/// Per-channel corrections and measured latency.
///
/// Installed as a whole; readers always see either the previous or the
/// new profile, never a mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Added to each input sample before gain.
    pub input_offset: [f32; MAX_CHANNELS],
    /// Multiplied into each input sample after offset.
    pub input_gain: [f32; MAX_CHANNELS],
    /// Output correction gain.
    pub output_gain: [f32; MAX_CHANNELS],
    /// Output correction offset [V].
    pub output_offset: [f32; MAX_CHANNELS],
    pub input_channels: u8,
    pub output_channels: u8,
    pub total_latency_us: u32,
    pub acquisition_latency_us: u32,
    pub analysis_latency_us: u32,
    pub actuation_latency_us: u32,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    /// Increments with every installed profile.
    pub revision: u32,
    pub is_valid: bool,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            input_offset: [0.0; MAX_CHANNELS],
            input_gain: [1.0; MAX_CHANNELS],
            output_gain: [1.0; MAX_CHANNELS],
            output_offset: [0.0; MAX_CHANNELS],
            input_channels: 0,
            output_channels: 0,
            total_latency_us: 0,
            acquisition_latency_us: 0,
            analysis_latency_us: 0,
            actuation_latency_us: 0,
            created_at: 0,
            revision: 0,
            is_valid: false,
        }
    }
}

impl CalibrationProfile {
    /// Identity corrections for the given channel counts.
    pub fn identity(input_channels: usize, output_channels: usize) -> Self {
        Self {
            input_channels: input_channels.min(MAX_CHANNELS) as u8,
            output_channels: output_channels.min(MAX_CHANNELS) as u8,
            ..Self::default()
        }
    }

    /// Store `total` and split it into equal acquisition/analysis/actuation thirds.
    pub fn set_latency(&mut self, total_us: u32) {
        let third = total_us / 3;
        self.total_latency_us = total_us;
        self.acquisition_latency_us = third;
        self.analysis_latency_us = third;
        self.actuation_latency_us = third;
    }

    /// Whether every correction of the channels in use is a finite number.
    pub fn has_finite_corrections(&self) -> bool {
        let inputs = (self.input_channels as usize).min(MAX_CHANNELS);
        let outputs = (self.output_channels as usize).min(MAX_CHANNELS);
        let finite = |table: &[f32]| table.iter().all(|v| v.is_finite());
        finite(&self.input_offset[..inputs])
            && finite(&self.input_gain[..inputs])
            && finite(&self.output_gain[..outputs])
            && finite(&self.output_offset[..outputs])
    }

    /// Bitwise equality, distinguishing `-0.0` from `0.0` and comparing NaN payloads.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.encode() == other.encode()
    }

    /// Encode as one fixed-size record.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let mut w = Writer { buf: &mut out, pos: 0 };
        w.put(&RECORD_MAGIC);
        w.put(&RECORD_VERSION.to_le_bytes());
        w.put(&[self.input_channels, self.output_channels]);
        w.put(&self.revision.to_le_bytes());
        w.put(&self.created_at.to_le_bytes());
        for latency in [
            self.total_latency_us,
            self.acquisition_latency_us,
            self.analysis_latency_us,
            self.actuation_latency_us,
        ] {
            w.put(&latency.to_le_bytes());
        }
        w.put(&[self.is_valid as u8, 0, 0, 0]);
        for table in [
            &self.input_offset,
            &self.input_gain,
            &self.output_gain,
            &self.output_offset,
        ] {
            for v in table {
                w.put(&v.to_bits().to_le_bytes());
            }
        }
        debug_assert_eq!(w.pos, RECORD_SIZE);
        out
    }

    /// Decode one record. Trailing bytes beyond `RECORD_SIZE` are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, CalibrationError> {
        if bytes.len() < RECORD_SIZE {
            return Err(CalibrationError::Truncated {
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        let mut r = Reader { buf: bytes, pos: 0 };
        if r.take::<4>() != RECORD_MAGIC {
            return Err(CalibrationError::BadMagic);
        }
        let version = u16::from_le_bytes(r.take());
        if version != RECORD_VERSION {
            return Err(CalibrationError::UnsupportedVersion(version));
        }
        let [input_channels, output_channels] = r.take();
        let revision = u32::from_le_bytes(r.take());
        let created_at = u64::from_le_bytes(r.take());
        let total_latency_us = u32::from_le_bytes(r.take());
        let acquisition_latency_us = u32::from_le_bytes(r.take());
        let analysis_latency_us = u32::from_le_bytes(r.take());
        let actuation_latency_us = u32::from_le_bytes(r.take());
        let [valid, ..] = r.take::<4>();

        let mut tables = [[0.0f32; MAX_CHANNELS]; 4];
        for table in tables.iter_mut() {
            for v in table.iter_mut() {
                *v = f32::from_bits(u32::from_le_bytes(r.take()));
            }
        }
        let [input_offset, input_gain, output_gain, output_offset] = tables;

        Ok(Self {
            input_offset,
            input_gain,
            output_gain,
            output_offset,
            input_channels,
            output_channels,
            total_latency_us,
            acquisition_latency_us,
            analysis_latency_us,
            actuation_latency_us,
            created_at,
            revision,
            is_valid: valid != 0,
        })
    }

    /// Write the record to `path` as a single block.
    ///
    /// The record goes to a sibling temporary file first and is renamed into
    /// place, so a crash never leaves a half-written profile behind.
    pub fn save_to_file(&self, path: &Path) -> Result<(), CalibrationError> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.encode()).map_err(|e| CalibrationError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| CalibrationError::Io(e.to_string()))?;
        debug!(path = %path.display(), revision = self.revision, "calibration record written");
        Ok(())
    }

    /// Read and decode a record from `path`.
    pub fn load_from_file(path: &Path) -> Result<Self, CalibrationError> {
        let bytes = std::fs::read(path).map_err(|e| CalibrationError::Io(e.to_string()))?;
        let profile = Self::decode(&bytes)?;
        debug!(path = %path.display(), revision = profile.revision, "calibration record read");
        Ok(profile)
    }
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    #[inline]
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    // Length is checked once against RECORD_SIZE before any take.
    #[inline]
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }
}
