//! # Hybrid Node HAL
//!
//! Hardware-port backends for the hybrid processing node.
//! Backends implement `HardwarePort` / `TransportPort` from
//! `hybrid_common::hal`; the node depends only on those traits.
//!
//! # Module Structure
//!
//! - [`registry`] - backend factory registration
//! - [`backends`] - backend implementations
//!
//! ```text
//! ┌───────────────┐    ┌──────────────────┐    ┌───────────────────┐
//! │  HybridNode   │───►│  HardwarePort    │◄───│  BackendRegistry  │
//! │ (hybrid_node) │    │  (trait object)  │    │  name → factory   │
//! └───────────────┘    └────────┬─────────┘    └───────────────────┘
//!                               │
//!                      ┌────────┴─────────┐
//!                      │  SimulatedPort   │
//!                      └──────────────────┘
//! ```

pub mod backends;
pub mod registry;

pub use crate::backends::default_registry;
pub use crate::registry::{BackendRegistry, PortFactory};
