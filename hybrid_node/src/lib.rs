//! # Hybrid Node Library
//!
//! Real-time core of the hybrid analog/DSP processing node. One fixed-rate
//! cycle takes a digitized input buffer through conditioning, spectral
//! analysis, closed-loop modulation and the safety interlocks, and produces
//! the actuation buffer, all within one buffer duration.
//!
//! ## Cycle
//!
//! ```text
//! port.read → SignalConditioner → MetricAnalyzer ─┬→ Modulator ──┐
//!                                                 └→ SafetyMonitor┴→ output → port.write
//! ```
//!
//! ## Zero-Allocation Cycle
//!
//! Filter state, the analysis window, FFT scratch and the flux ring are
//! allocated once at `init`. `HybridNode::process` performs no heap
//! allocation, no blocking lock and no logging outside state changes.
//!
//! ## Non-RT Surface
//!
//! Lifecycle, configuration, calibration and profile persistence return
//! `Result<_, NodeError>` and are only legal while the cycle is stopped.

pub mod acquisition;
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod control;
pub mod link;
pub mod node;
pub mod runner;
pub mod safety;
pub mod signal;
pub mod stats;

pub use crate::node::{CycleOutcome, HybridNode, StatusHandle};
pub use crate::runner::{CycleRunner, RunnerError};
