//! Driver registry for PETRA channels.
//!
//! Maps driver names to channel factories. Built once at startup and
//! consulted when the lifecycle controller opens the hardware.

use petra_common::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::drivers::register_all_drivers;

/// Registry of available channel drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, ChannelFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding the built-in "device" and "simulation" drivers.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: ChannelFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<ChannelFactory> {
        self.factories.get(name).copied()
    }

    /// Open the channel named by `config.driver`.
    ///
    /// # Errors
    /// `ChannelError::DriverNotFound` for an unknown name, otherwise
    /// whatever the driver's factory reports.
    pub fn open(&self, config: &DeviceConfig) -> Result<Box<dyn HardwareChannel>, ChannelError> {
        let factory = self
            .get_factory(&config.driver)
            .ok_or_else(|| ChannelError::DriverNotFound(config.driver.clone()))?;
        let channel = factory(config)?;
        info!("Opened '{}' channel", channel.name());
        Ok(channel)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
