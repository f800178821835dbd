//! Driver registry for GPIO backends.
//!
//! Maps driver names to `PortFactory` functions. Built at startup and
//! passed by value; no global state.

use ror_common::gpio::{GpioError, GpioPort, PortFactory};
use std::collections::HashMap;

/// Registry of available GPIO drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, PortFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry populated with every driver in [`crate::drivers`].
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: PortFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<PortFactory> {
        self.factories.get(name).copied()
    }

    /// Create a port instance by name.
    ///
    /// # Errors
    /// Returns `GpioError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_port(&self, name: &str) -> Result<Box<dyn GpioPort>, GpioError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| GpioError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// All registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ror_common::config::RoofConfig;
    use ror_common::gpio::{Level, PinMode, Pull};

    struct NullPort;

    impl GpioPort for NullPort {
        fn name(&self) -> &'static str {
            "null"
        }
        fn connect(&mut self, _config: &RoofConfig) -> Result<(), GpioError> {
            Ok(())
        }
        fn disconnect(&mut self) -> Result<(), GpioError> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn set_mode(&mut self, _pin: u8, _mode: PinMode) -> Result<(), GpioError> {
            Ok(())
        }
        fn set_pull(&mut self, _pin: u8, _pull: Pull) -> Result<(), GpioError> {
            Ok(())
        }
        fn read(&mut self, _pin: u8) -> Result<Level, GpioError> {
            Ok(Level::Low)
        }
        fn write(&mut self, _pin: u8, _level: Level) -> Result<(), GpioError> {
            Ok(())
        }
    }

    fn create_null() -> Box<dyn GpioPort> {
        Box::new(NullPort)
    }

    #[test]
    fn register_and_create() {
        let mut registry = DriverRegistry::new();
        registry.register("null", create_null);
        let port = registry.create_port("null").unwrap();
        assert_eq!(port.name(), "null");
    }

    #[test]
    fn unknown_driver() {
        let registry = DriverRegistry::new();
        assert!(matches!(
            registry.create_port("pigpio"),
            Err(GpioError::DriverNotFound(name)) if name == "pigpio"
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = DriverRegistry::new();
        registry.register("null", create_null);
        registry.register("null", create_null);
    }

    #[test]
    fn builtin_drivers() {
        let registry = DriverRegistry::with_builtin_drivers();
        assert_eq!(registry.list_drivers(), vec!["simulation", "sysfs"]);
    }
}
