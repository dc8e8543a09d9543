//! Simulation driver module.
//!
//! This module provides an in-memory PETRA channel for development and
//! testing without the physical devices.

mod driver;
mod io;

pub use driver::{SimulatedChannel, SimulationProbe};
pub use io::BenchModel;

use petra_common::config::DeviceConfig;
use petra_common::hal::driver::{ChannelError, HardwareChannel};

/// Factory function to open a simulated channel. Device paths are ignored.
pub fn create_driver(_config: &DeviceConfig) -> Result<Box<dyn HardwareChannel>, ChannelError> {
    Ok(Box::new(SimulatedChannel::unprobed()))
}
