//! Control connection protocol.
//!
//! The client sends one little-endian `i32` tag per request and receives
//! the resulting actuator byte. The telemetry connection carries raw
//! sensor bytes and has no framing of its own.

use crate::consts::COMMAND_FRAME_LEN;
use crate::hal::registers::RollerArmPosition;

/// A client command. Commands carry no payload beyond their tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Command {
    /// Acknowledge only.
    NoOp = 0,
    /// Toggle roller 1.
    Roller1 = 1,
    /// Toggle roller 2.
    Roller2 = 2,
    /// Pulse the suction cup.
    Sucker = 3,
    /// Toggle the diver (tub).
    Tub = 4,
    /// Toggle the arm.
    Arm = 5,
    /// Toggle the hook (blocker).
    Blocker = 6,
    /// Roller arm to neutral.
    ArmNeutral = 7,
    /// Roller arm to roller 1.
    ArmR1 = 8,
    /// Roller arm to roller 2.
    ArmR2 = 9,
    /// Roller arm to both rollers.
    ArmR1R2 = 10,
    /// Flip auto-commit mode.
    AutoCommit = 11,
    /// Write the actuator register now.
    Commit = 12,
    /// End the session.
    Exit = 13,
}

impl Command {
    /// Decode a tag. Unknown tags return `None`.
    #[inline]
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::NoOp),
            1 => Some(Self::Roller1),
            2 => Some(Self::Roller2),
            3 => Some(Self::Sucker),
            4 => Some(Self::Tub),
            5 => Some(Self::Arm),
            6 => Some(Self::Blocker),
            7 => Some(Self::ArmNeutral),
            8 => Some(Self::ArmR1),
            9 => Some(Self::ArmR2),
            10 => Some(Self::ArmR1R2),
            11 => Some(Self::AutoCommit),
            12 => Some(Self::Commit),
            13 => Some(Self::Exit),
            _ => None,
        }
    }

    /// Wire tag of this command.
    #[inline]
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// True for commands followed by an auto-commit write.
    ///
    /// Everything except `NoOp`, `AutoCommit` and `Exit`. `Commit` is
    /// included: in auto-commit mode it writes once for the forced commit
    /// and once more for the auto-commit.
    #[inline]
    pub const fn is_state_changing(self) -> bool {
        matches!(
            self,
            Self::Commit
                | Self::Roller1
                | Self::Roller2
                | Self::Sucker
                | Self::Tub
                | Self::Arm
                | Self::Blocker
                | Self::ArmNeutral
                | Self::ArmR1
                | Self::ArmR2
                | Self::ArmR1R2
        )
    }

    /// Target position for the four arm-select commands.
    #[inline]
    pub const fn roller_arm_position(self) -> Option<RollerArmPosition> {
        match self {
            Self::ArmNeutral => Some(RollerArmPosition::Neutral),
            Self::ArmR1 => Some(RollerArmPosition::Roller1),
            Self::ArmR2 => Some(RollerArmPosition::Roller2),
            Self::ArmR1R2 => Some(RollerArmPosition::Both),
            _ => None,
        }
    }
}

/// Decode one command frame into its raw tag.
#[inline]
pub const fn decode_frame(frame: [u8; COMMAND_FRAME_LEN]) -> i32 {
    i32::from_le_bytes(frame)
}

/// Encode a command as a frame, as a client would send it.
#[inline]
pub const fn encode_frame(command: Command) -> [u8; COMMAND_FRAME_LEN] {
    command.tag().to_le_bytes()
}
