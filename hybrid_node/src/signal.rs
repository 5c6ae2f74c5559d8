//! Signal conditioning: calibration correction and the analog filter chain.
//!
//! - [`filters`] - one-pole high-pass / low-pass primitives
//! - [`conditioner`] - per-channel conditioning and level metrics

pub mod conditioner;
pub mod filters;

pub use conditioner::SignalConditioner;
