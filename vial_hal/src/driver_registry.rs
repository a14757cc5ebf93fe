//! Name-to-factory lookup for pipetting drivers.
//!
//! The engine config names its driver (`engine.driver`); the replay binary
//! resolves that name here once at startup. No global state.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use vial_common::hal::driver::{DriverFactory, HardwareError, PipettingHardware};

/// Pipetting drivers known by name.
#[derive(Default)]
pub struct DriverRegistry {
    factories: BTreeMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Registry with no drivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every driver shipped with this crate.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Add a driver under `name`, returning the factory it replaces.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> Option<DriverFactory> {
        let previous = self.factories.insert(name, factory);
        if previous.is_some() {
            warn!("Pipetting driver '{name}' registered twice; keeping the newer factory");
        }
        previous
    }

    /// Build the driver called `name`.
    ///
    /// # Errors
    /// `HardwareError::DriverNotFound` for an unregistered name.
    pub fn create_driver(&self, name: &str) -> Result<Arc<dyn PipettingHardware>, HardwareError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HardwareError::DriverNotFound(name.to_string()))?;
        let driver = factory();
        info!("Pipetting driver '{}' v{} ready", driver.name(), driver.version());
        Ok(driver)
    }

    /// Registered names in alphabetical order.
    pub fn driver_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}
