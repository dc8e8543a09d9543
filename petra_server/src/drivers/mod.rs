//! PETRA channel drivers.
//!
//! - [`device`] - The PETRA character devices
//! - [`simulation`] - In-memory bench for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `HardwareChannel` from `petra_common::hal::driver`
//! 3. Register its factory in [`register_all_drivers`]

pub mod device;
pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("device", device::create_driver);
    registry.register("simulation", simulation::create_driver);
}
