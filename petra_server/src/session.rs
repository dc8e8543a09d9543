//! Shared device state.
//!
//! `DeviceSession` owns the single in-memory copy of the actuator and
//! sensor registers together with the hardware channel. Every register
//! mutation and every channel transfer happens under one
//! `parking_lot::Mutex`, scoped to one operation. Network I/O never runs
//! under this lock.
//!
//! The command processor takes the lock once per command through
//! [`DeviceSession::lock`] so that a mutation and its commit form one
//! critical section. Everything else uses the single-operation methods.
//!
//! Teardown seals the session with [`DeviceSession::seal_and_reset`]: the
//! final zero write and the seal happen under one lock acquisition, and
//! from then on commits are refused and commands leave the register alone.

use parking_lot::{Mutex, MutexGuard};
use petra_common::hal::driver::{ChannelError, HardwareChannel};
use petra_common::hal::registers::{Actuators, RollerArmPosition, Sensors};
use petra_common::protocol::Command;
use tracing::{debug, trace};

/// Registers plus the channel they are transferred over.
pub struct DeviceState {
    actuators: Actuators,
    sensors: Sensors,
    channel: Box<dyn HardwareChannel>,
    writes: u64,
    reads: u64,
    sealed: bool,
}

impl DeviceState {
    fn new(channel: Box<dyn HardwareChannel>) -> Self {
        Self {
            actuators: Actuators::SAFE,
            sensors: Sensors::default(),
            channel,
            writes: 0,
            reads: 0,
            sealed: false,
        }
    }

    /// Decoded actuator register.
    pub fn actuators(&self) -> Actuators {
        self.actuators
    }

    /// Decoded sensor register (last hardware read).
    pub fn sensors(&self) -> Sensors {
        self.sensors
    }

    /// Current actuator byte.
    pub fn actuator_byte(&self) -> u8 {
        self.actuators.encode()
    }

    /// Current sensor byte.
    pub fn sensor_byte(&self) -> u8 {
        self.sensors.encode()
    }

    /// Number of successful hardware writes.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Number of successful hardware reads.
    pub fn read_count(&self) -> u64 {
        self.reads
    }

    /// True once teardown has sealed the session.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Flip roller 1.
    pub fn toggle_roller1(&mut self) {
        self.actuators.roller1 = !self.actuators.roller1;
    }

    /// Flip roller 2.
    pub fn toggle_roller2(&mut self) {
        self.actuators.roller2 = !self.actuators.roller2;
    }

    /// Request a suction pulse. Cleared again by the next successful write.
    pub fn pulse_sucker(&mut self) {
        self.actuators.sucker = true;
    }

    /// Flip the diver.
    pub fn toggle_diver(&mut self) {
        self.actuators.diver = !self.actuators.diver;
    }

    /// Flip the arm.
    pub fn toggle_arm(&mut self) {
        self.actuators.arm = !self.actuators.arm;
    }

    /// Flip the hook.
    pub fn toggle_hook(&mut self) {
        self.actuators.hook = !self.actuators.hook;
    }

    /// Select the roller-arm position from its raw 2-bit value.
    ///
    /// Values outside the four positions leave the register unchanged and
    /// return `false`.
    pub fn set_roller_arm_position(&mut self, raw: u8) -> bool {
        match RollerArmPosition::from_u8(raw) {
            Some(position) => {
                self.actuators.roller_arm = position;
                true
            }
            None => {
                debug!("Ignoring out-of-range roller arm position {raw}");
                false
            }
        }
    }

    /// Apply the register mutation a command stands for.
    ///
    /// Returns `true` if the command maps to a mutation. Protocol-only
    /// commands (no-op, auto-commit, commit, exit) return `false`, and so
    /// does every command once the session is sealed.
    pub fn apply(&mut self, command: Command) -> bool {
        if self.sealed {
            debug!("Session sealed, ignoring {:?}", command);
            return false;
        }
        match command {
            Command::Roller1 => self.toggle_roller1(),
            Command::Roller2 => self.toggle_roller2(),
            Command::Sucker => self.pulse_sucker(),
            Command::Tub => self.toggle_diver(),
            Command::Arm => self.toggle_arm(),
            Command::Blocker => self.toggle_hook(),
            Command::ArmNeutral | Command::ArmR1 | Command::ArmR2 | Command::ArmR1R2 => {
                if let Some(position) = command.roller_arm_position() {
                    self.set_roller_arm_position(position.as_u8());
                }
            }
            Command::NoOp | Command::AutoCommit | Command::Commit | Command::Exit => {
                return false;
            }
        }
        true
    }

    /// Write the actuator byte to hardware.
    ///
    /// On success the sucker bit is cleared in memory (pulsed activation).
    /// On failure the register keeps its value. A sealed session refuses
    /// the write with `ChannelError::SessionClosed`.
    pub fn commit(&mut self) -> Result<u8, ChannelError> {
        if self.sealed {
            return Err(ChannelError::SessionClosed {
                operation: "commit",
            });
        }
        self.write_out()
    }

    fn write_out(&mut self) -> Result<u8, ChannelError> {
        let byte = self.actuators.encode();
        self.channel.write_byte(byte)?;
        self.actuators.sucker = false;
        self.writes += 1;
        trace!("actuators <- {:08b}", byte);
        Ok(byte)
    }

    /// Read one sensor byte from hardware into the sensor register.
    pub fn poll_sensors(&mut self) -> Result<u8, ChannelError> {
        let byte = self.channel.read_byte()?;
        self.sensors = Sensors::decode(byte);
        self.reads += 1;
        trace!("sensors -> {}", self.sensors);
        Ok(byte)
    }

    /// Zero the actuator register and write it out immediately.
    ///
    /// Allowed on a sealed session, so repeated teardowns keep retrying the
    /// safe state.
    pub fn reset_to_zero(&mut self) -> Result<(), ChannelError> {
        self.actuators = Actuators::SAFE;
        self.write_out().map(|_| ())
    }

    /// Zero the register, write it out, and refuse any later commit.
    ///
    /// The seal holds even when the final write fails.
    pub fn seal_and_reset(&mut self) -> Result<(), ChannelError> {
        self.sealed = true;
        self.reset_to_zero()
    }
}

/// The lock-guarded device state shared by the command processor, the
/// sensor poller and the lifecycle controller.
pub struct DeviceSession {
    state: Mutex<DeviceState>,
    driver: &'static str,
}

impl DeviceSession {
    /// Wrap an opened channel. The register starts at the safe state in
    /// memory; call [`DeviceSession::reset_to_zero`] to push it out.
    pub fn new(channel: Box<dyn HardwareChannel>) -> Self {
        let driver = channel.name();
        Self {
            state: Mutex::new(DeviceState::new(channel)),
            driver,
        }
    }

    /// Name of the driver behind the channel.
    pub fn driver_name(&self) -> &'static str {
        self.driver
    }

    /// Take the lock for a multi-step critical section.
    pub fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock()
    }

    /// Current actuator byte.
    pub fn actuator_byte(&self) -> u8 {
        self.state.lock().actuator_byte()
    }

    /// Current sensor byte.
    pub fn sensor_byte(&self) -> u8 {
        self.state.lock().sensor_byte()
    }

    /// Flip roller 1.
    pub fn toggle_roller1(&self) {
        self.state.lock().toggle_roller1();
    }

    /// Flip roller 2.
    pub fn toggle_roller2(&self) {
        self.state.lock().toggle_roller2();
    }

    /// Request a suction pulse.
    pub fn pulse_sucker(&self) {
        self.state.lock().pulse_sucker();
    }

    /// Flip the diver.
    pub fn toggle_diver(&self) {
        self.state.lock().toggle_diver();
    }

    /// Flip the arm.
    pub fn toggle_arm(&self) {
        self.state.lock().toggle_arm();
    }

    /// Flip the hook.
    pub fn toggle_hook(&self) {
        self.state.lock().toggle_hook();
    }

    /// See [`DeviceState::set_roller_arm_position`].
    pub fn set_roller_arm_position(&self, raw: u8) -> bool {
        self.state.lock().set_roller_arm_position(raw)
    }

    /// Write the actuator register to hardware.
    pub fn commit(&self) -> Result<u8, ChannelError> {
        self.state.lock().commit()
    }

    /// Read the sensor byte from hardware.
    pub fn poll_sensors(&self) -> Result<u8, ChannelError> {
        self.state.lock().poll_sensors()
    }

    /// Safe-state operation: zero the actuators and write them out.
    pub fn reset_to_zero(&self) -> Result<(), ChannelError> {
        self.state.lock().reset_to_zero()
    }

    /// Final safe-state write under the same lock as the seal.
    /// See [`DeviceState::seal_and_reset`].
    pub fn seal_and_reset(&self) -> Result<(), ChannelError> {
        self.state.lock().seal_and_reset()
    }

    /// True once teardown has sealed the session.
    pub fn is_sealed(&self) -> bool {
        self.state.lock().is_sealed()
    }

    /// Release the hardware channel.
    pub fn shutdown(&self) -> Result<(), ChannelError> {
        self.state.lock().channel.shutdown()
    }
}
