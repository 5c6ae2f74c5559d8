//! Simulation backend.
//!
//! A deterministic software port: a signal generator in front of a virtual
//! ADC, a virtual microsecond clock, an optional loopback of the actuation
//! buffer, a settable temperature sensor, and failure injection.

mod clock;
mod port;
mod signal;

pub use clock::{ClockMode, VirtualClock};
pub use port::{FailurePoint, SimulatedPort, SimulationSettings};
pub use signal::{SignalGenerator, SignalSource};

use hybrid_common::hal::{HalError, HardwarePort};

/// Factory for the `simulation` backend.
///
/// # Errors
/// `HalError::InitFailed` if the options table does not parse as
/// [`SimulationSettings`].
pub fn create_port(options: &toml::Table) -> Result<Box<dyn HardwarePort>, HalError> {
    let settings = SimulationSettings::from_table(options)?;
    Ok(Box::new(SimulatedPort::new(settings)))
}
