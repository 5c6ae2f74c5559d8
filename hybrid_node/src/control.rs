//! Control loop root.
//!
//! - [`modulator`] - analysis + operator set-points → actuation command
//! - [`output`] - actuation buffer assembly and rail clamp

pub mod modulator;
pub mod output;

pub use modulator::{Modulation, Modulator};
