//! Inter-node transport.
//!
//! - [`frame`] - fixed-channel frame layout and metric slot assignment
//! - [`codec`] - metric/payload encode and decode, wire byte order
//! - [`sync`] - synchronization pulse counter and drift measurement

pub mod codec;
pub mod frame;
pub mod sync;

pub use codec::{AuxMetric, DecodedMetrics, TransportError};
pub use frame::{TransportFrame, TransportMetrics};
pub use sync::{DriftMeter, SyncPulse, drift_ppm};
