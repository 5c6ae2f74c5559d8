//! Backend registry.
//!
//! Maps backend names to port factories. The registry is built at startup,
//! populated via `register()` and consulted once when the node's port is
//! created. No global state.

use hybrid_common::hal::{HalError, HardwarePort};
use std::collections::HashMap;

/// Creates a port from its backend-specific options table.
///
/// The table is the `[backend.options]` section of the node's config file;
/// each backend parses the keys it understands.
pub type PortFactory = fn(&toml::Table) -> Result<Box<dyn HardwarePort>, HalError>;

/// Registry of available hardware-port backends.
pub struct BackendRegistry {
    factories: HashMap<&'static str, PortFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: PortFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<PortFactory> {
        self.factories.get(name).copied()
    }

    /// Create a port by backend name.
    ///
    /// # Errors
    /// `HalError::BackendNotFound` for an unknown name; otherwise whatever the
    /// factory reports for invalid options.
    pub fn create_port(
        &self,
        name: &str,
        options: &toml::Table,
    ) -> Result<Box<dyn HardwarePort>, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::BackendNotFound(name.to_string()))?;
        factory(options)
    }

    /// Registered backend names, sorted.
    pub fn list_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybrid_common::hal::PortLayout;

    struct TestPort;

    impl HardwarePort for TestPort {
        fn name(&self) -> &'static str {
            "test"
        }
        fn init(&mut self, _layout: &PortLayout) -> Result<(), HalError> {
            Ok(())
        }
        fn shutdown(&mut self) -> Result<(), HalError> {
            Ok(())
        }
        fn read(&mut self, buffer: &mut [f32], _frames: usize) -> Result<(), HalError> {
            buffer.fill(0.0);
            Ok(())
        }
        fn write(&mut self, _buffer: &[f32], _frames: usize) -> Result<(), HalError> {
            Ok(())
        }
        fn set_input_gain(&mut self, _gain: f32) -> Result<(), HalError> {
            Ok(())
        }
    }

    fn create_test_port(_options: &toml::Table) -> Result<Box<dyn HardwarePort>, HalError> {
        Ok(Box::new(TestPort))
    }

    fn reject_options(options: &toml::Table) -> Result<Box<dyn HardwarePort>, HalError> {
        Err(HalError::InitFailed(format!("{} unknown options", options.len())))
    }

    #[test]
    fn register_and_create() {
        let mut reg = BackendRegistry::new();
        reg.register("test_port", create_test_port);

        let port = reg.create_port("test_port", &toml::Table::new()).unwrap();
        assert_eq!(port.name(), "test");
    }

    #[test]
    fn backend_not_found() {
        let reg = BackendRegistry::new();
        let result = reg.create_port("nonexistent", &toml::Table::new());
        assert!(matches!(result, Err(HalError::BackendNotFound(_))));
    }

    #[test]
    fn factory_error_is_forwarded() {
        let mut reg = BackendRegistry::new();
        reg.register("picky", reject_options);
        let mut options = toml::Table::new();
        options.insert("bogus".into(), toml::Value::Boolean(true));
        assert_eq!(
            reg.create_port("picky", &options).err(),
            Some(HalError::InitFailed("1 unknown options".into()))
        );
    }

    #[test]
    fn list_is_sorted() {
        let mut reg = BackendRegistry::new();
        reg.register("beta", create_test_port);
        reg.register("alpha", create_test_port);
        assert_eq!(reg.list_backends(), vec!["alpha", "beta"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_panics() {
        let mut reg = BackendRegistry::new();
        reg.register("dup", create_test_port);
        reg.register("dup", create_test_port);
    }
}
