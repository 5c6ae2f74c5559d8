//! Hybrid Node Common Library
//!
//! Shared types for the real-time hybrid processing node: configuration,
//! state enums, metric records, the calibration record, hardware-port
//! traits and the inter-node transport codec. No real-time logic lives here.
//!
//! # Module Structure
//!
//! - [`consts`] - defaults and parameter bounds
//! - [`config`] - configuration loading traits and types
//! - [`node`] - node configuration, state, metrics, calibration, errors
//! - [`hal`] - hardware and transport port traits
//! - [`transport`] - transport frame codec and sync pulse
//! - [`prelude`] - common re-exports for convenience

pub mod config;
pub mod consts;
pub mod hal;
pub mod node;
pub mod prelude;
pub mod transport;
