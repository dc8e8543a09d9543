//! Prelude module for common re-exports.
//!
//! ```rust
//! use petra_common::prelude::*;
//!
//! let actuators = Actuators::decode(0b0100_0001);
//! assert_eq!(actuators.roller_arm, RollerArmPosition::Both);
//! assert_eq!(Command::from_tag(12), Some(Command::Commit));
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, DeviceConfig, LogLevel, PetraConfig};

// ─── Registers ──────────────────────────────────────────────────────
pub use crate::hal::registers::{Actuators, RollerArmPosition, Sensors};

// ─── Hardware channel ───────────────────────────────────────────────
pub use crate::hal::driver::{ChannelError, ChannelFactory, HardwareChannel};

// ─── Protocol ───────────────────────────────────────────────────────
pub use crate::protocol::Command;
