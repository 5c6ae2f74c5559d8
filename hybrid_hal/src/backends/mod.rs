//! Hardware-port backend implementations.
//!
//! - [`simulation`] - deterministic software port for development and testing
//! - [`loopback`] - in-memory transport for link self-tests
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `backends/`
//! 2. Implement `HardwarePort` from `hybrid_common::hal`
//! 3. Register its factory in [`register_all_backends`]

pub mod loopback;
pub mod simulation;

use crate::registry::BackendRegistry;

/// Register every built-in backend.
pub fn register_all_backends(registry: &mut BackendRegistry) {
    registry.register("simulation", simulation::create_port);
}

/// A registry holding every built-in backend.
pub fn default_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    register_all_backends(&mut registry);
    registry
}
