//! Hardware interfaces.
//!
//! The core never calls platform APIs directly: sample I/O goes through a
//! [`HardwarePort`], inter-node frames through a [`TransportPort`].

pub mod port;

pub use port::{HalError, HardwarePort, PortLayout, TransportPort, monotonic_us};
