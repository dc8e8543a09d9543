//! Bench model: how simulated sensors react to actuator writes.
//!
//! A real PETRA bench reports the arm and diver end-stops once the
//! corresponding actuator has been driven. The model links those sensor
//! bits to the last written actuator byte; all other sensor bits stay
//! under test control.

use petra_common::hal::registers::{Actuators, SensorBits};
use tracing::debug;

/// Sensor state of the simulated bench.
#[derive(Debug, Clone)]
pub struct BenchModel {
    /// Current sensor byte
    sensors: SensorBits,
    /// Whether arm/diver sensors follow the actuators
    linked: bool,
}

impl BenchModel {
    /// Create a bench with all sensors low and linked reactions enabled.
    pub fn new() -> Self {
        Self {
            sensors: SensorBits::empty(),
            linked: true,
        }
    }

    /// Enable or disable the actuator → sensor links.
    pub fn set_linked(&mut self, linked: bool) {
        self.linked = linked;
    }

    /// Override the whole sensor byte.
    pub fn set_sensors(&mut self, byte: u8) {
        self.sensors = SensorBits::from_bits_retain(byte);
    }

    /// Current sensor byte.
    pub fn sensors(&self) -> u8 {
        self.sensors.bits()
    }

    /// React to an actuator byte reaching the bench.
    pub fn on_actuators(&mut self, byte: u8) {
        if !self.linked {
            return;
        }
        let actuators = Actuators::decode(byte);
        self.sensors.set(SensorBits::ARM, actuators.arm);
        self.sensors.set(SensorBits::DIVER, actuators.diver);
        debug!("Bench sensors now {:08b}", self.sensors.bits());
    }
}

impl Default for BenchModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_and_diver_follow_actuators() {
        let mut bench = BenchModel::new();
        bench.set_sensors(0b1000_0000);
        bench.on_actuators(0b0000_0110);
        assert_eq!(bench.sensors(), 0b1000_0110);
        bench.on_actuators(0b0000_0010);
        assert_eq!(bench.sensors(), 0b1000_0100);
    }

    #[test]
    fn unlinked_bench_ignores_writes() {
        let mut bench = BenchModel::new();
        bench.set_linked(false);
        bench.on_actuators(0xFF);
        assert_eq!(bench.sensors(), 0);
    }
}
