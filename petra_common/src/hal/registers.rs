//! Bit-packed actuator and sensor registers.
//!
//! Both registers are a single byte on the wire. The layout is fixed here
//! (bit 7 = most significant) and never derived from compiler bit-field
//! ordering:
//!
//! ```text
//! actuators: [roller_arm:2][roller1][roller2][sucker][diver][arm][hook]
//! sensors:   [sensor1][sensor2][t][slot][chariot][arm][diver][tub]
//! ```
//!
//! Every byte value decodes; the four roller-arm positions cover the whole
//! 2-bit field.

use bitflags::bitflags;
use static_assertions::{assert_eq_size, const_assert_eq};
use std::fmt;

bitflags! {
    /// Single-bit actuator fields at their wire positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActuatorBits: u8 {
        /// Roller 1 motor.
        const ROLLER1 = 0b0010_0000;
        /// Roller 2 motor.
        const ROLLER2 = 0b0001_0000;
        /// Suction cup. Pulsed: cleared in memory after every write.
        const SUCKER  = 0b0000_1000;
        /// Diving mechanism.
        const DIVER   = 0b0000_0100;
        /// Arm.
        const ARM     = 0b0000_0010;
        /// Hook (blocker).
        const HOOK    = 0b0000_0001;
    }
}

bitflags! {
    /// Sensor status bits at their wire positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SensorBits: u8 {
        /// Presence sensor 1.
        const SENSOR1 = 0b1000_0000;
        /// Presence sensor 2.
        const SENSOR2 = 0b0100_0000;
        /// T sensor.
        const T       = 0b0010_0000;
        /// Slot sensor.
        const SLOT    = 0b0001_0000;
        /// Carriage in position.
        const CHARIOT = 0b0000_1000;
        /// Arm end-stop.
        const ARM     = 0b0000_0100;
        /// Diver end-stop.
        const DIVER   = 0b0000_0010;
        /// Tub sensor.
        const TUB     = 0b0000_0001;
    }
}

/// Mask of the 2-bit roller-arm position field.
pub const ROLLER_ARM_MASK: u8 = 0b1100_0000;

/// Shift of the roller-arm position field.
pub const ROLLER_ARM_SHIFT: u32 = 6;

const_assert_eq!(ROLLER_ARM_MASK & ActuatorBits::all().bits(), 0);
const_assert_eq!(ROLLER_ARM_MASK | ActuatorBits::all().bits(), u8::MAX);
assert_eq_size!(ActuatorBits, u8);
assert_eq_size!(SensorBits, u8);
assert_eq_size!(RollerArmPosition, u8);

/// Position of the arm that selects which rollers are engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RollerArmPosition {
    /// Arm resting, no roller selected.
    #[default]
    Neutral = 0,
    /// Both rollers.
    Both = 1,
    /// Roller 1 only.
    Roller1 = 2,
    /// Roller 2 only.
    Roller2 = 3,
}

impl RollerArmPosition {
    /// Decode a raw position value. Values above 3 are rejected.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Neutral),
            1 => Some(Self::Both),
            2 => Some(Self::Roller1),
            3 => Some(Self::Roller2),
            _ => None,
        }
    }

    /// Raw 2-bit value of this position.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Decoded view of the actuator register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actuators {
    /// Roller-arm selector.
    pub roller_arm: RollerArmPosition,
    /// Roller 1 running.
    pub roller1: bool,
    /// Roller 2 running.
    pub roller2: bool,
    /// Suction pulse requested.
    pub sucker: bool,
    /// Diver lowered.
    pub diver: bool,
    /// Arm extended.
    pub arm: bool,
    /// Hook engaged.
    pub hook: bool,
}

impl Actuators {
    /// All actuators off, arm neutral.
    pub const SAFE: Self = Self {
        roller_arm: RollerArmPosition::Neutral,
        roller1: false,
        roller2: false,
        sucker: false,
        diver: false,
        arm: false,
        hook: false,
    };

    /// Decode an actuator byte.
    pub const fn decode(byte: u8) -> Self {
        let bits = ActuatorBits::from_bits_truncate(byte);
        let roller_arm = match (byte & ROLLER_ARM_MASK) >> ROLLER_ARM_SHIFT {
            0 => RollerArmPosition::Neutral,
            1 => RollerArmPosition::Both,
            2 => RollerArmPosition::Roller1,
            _ => RollerArmPosition::Roller2,
        };
        Self {
            roller_arm,
            roller1: bits.contains(ActuatorBits::ROLLER1),
            roller2: bits.contains(ActuatorBits::ROLLER2),
            sucker: bits.contains(ActuatorBits::SUCKER),
            diver: bits.contains(ActuatorBits::DIVER),
            arm: bits.contains(ActuatorBits::ARM),
            hook: bits.contains(ActuatorBits::HOOK),
        }
    }

    /// Encode to the wire byte.
    pub fn encode(&self) -> u8 {
        let mut bits = ActuatorBits::empty();
        bits.set(ActuatorBits::ROLLER1, self.roller1);
        bits.set(ActuatorBits::ROLLER2, self.roller2);
        bits.set(ActuatorBits::SUCKER, self.sucker);
        bits.set(ActuatorBits::DIVER, self.diver);
        bits.set(ActuatorBits::ARM, self.arm);
        bits.set(ActuatorBits::HOOK, self.hook);
        (self.roller_arm.as_u8() << ROLLER_ARM_SHIFT) | bits.bits()
    }
}

/// Decoded view of the sensor register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sensors {
    bits: SensorBits,
}

impl Sensors {
    /// Decode a sensor byte. All eight bits are meaningful.
    #[inline]
    pub const fn decode(byte: u8) -> Self {
        Self {
            bits: SensorBits::from_bits_retain(byte),
        }
    }

    /// Encode to the wire byte.
    #[inline]
    pub const fn encode(&self) -> u8 {
        self.bits.bits()
    }

    /// Raw flag view.
    #[inline]
    pub const fn bits(&self) -> SensorBits {
        self.bits
    }

    pub fn sensor1(&self) -> bool {
        self.bits.contains(SensorBits::SENSOR1)
    }

    pub fn sensor2(&self) -> bool {
        self.bits.contains(SensorBits::SENSOR2)
    }

    pub fn t(&self) -> bool {
        self.bits.contains(SensorBits::T)
    }

    pub fn slot(&self) -> bool {
        self.bits.contains(SensorBits::SLOT)
    }

    /// Carriage in position.
    pub fn chariot(&self) -> bool {
        self.bits.contains(SensorBits::CHARIOT)
    }

    pub fn arm(&self) -> bool {
        self.bits.contains(SensorBits::ARM)
    }

    pub fn diver(&self) -> bool {
        self.bits.contains(SensorBits::DIVER)
    }

    pub fn tub(&self) -> bool {
        self.bits.contains(SensorBits::TUB)
    }
}

impl fmt::Display for Actuators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.encode())
    }
}

impl fmt::Display for Sensors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actuator_layout_matches_wire() {
        let a = Actuators {
            roller_arm: RollerArmPosition::Roller2,
            ..Actuators::SAFE
        };
        assert_eq!(a.encode(), 0b1100_0000);

        let a = Actuators {
            hook: true,
            ..Actuators::SAFE
        };
        assert_eq!(a.encode(), 0b0000_0001);

        let a = Actuators {
            roller1: true,
            sucker: true,
            ..Actuators::SAFE
        };
        assert_eq!(a.encode(), 0b0010_1000);
    }

    #[test]
    fn decode_every_byte() {
        for byte in 0..=u8::MAX {
            assert_eq!(Actuators::decode(byte).encode(), byte);
            assert_eq!(Sensors::decode(byte).encode(), byte);
        }
    }

    #[test]
    fn safe_state_is_zero() {
        assert_eq!(Actuators::SAFE.encode(), 0);
        assert_eq!(Actuators::default(), Actuators::SAFE);
    }

    #[test]
    fn sensors_default_is_all_low() {
        assert_eq!(Sensors::default().encode(), 0);
        assert_eq!(SensorBits::default(), SensorBits::empty());
    }

    #[test]
    fn roller_arm_bound_check() {
        assert_eq!(RollerArmPosition::from_u8(1), Some(RollerArmPosition::Both));
        assert_eq!(RollerArmPosition::from_u8(3), Some(RollerArmPosition::Roller2));
        assert_eq!(RollerArmPosition::from_u8(4), None);
        assert_eq!(RollerArmPosition::from_u8(u8::MAX), None);
    }

    #[test]
    fn sensor_getters() {
        let s = Sensors::decode(0b1000_1001);
        assert!(s.sensor1());
        assert!(!s.sensor2());
        assert!(!s.t());
        assert!(!s.slot());
        assert!(s.chariot());
        assert!(!s.arm());
        assert!(!s.diver());
        assert!(s.tub());
    }

    #[test]
    fn display_is_msb_first() {
        assert_eq!(Sensors::decode(0b0100_1000).to_string(), "01001000");
        let a = Actuators {
            roller_arm: RollerArmPosition::Both,
            ..Actuators::SAFE
        };
        assert_eq!(a.to_string(), "01000000");
    }
}
