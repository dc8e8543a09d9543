//! PETRA Common Library
//!
//! This crate provides the register codec, command protocol, hardware
//! channel trait and configuration loading shared by all PETRA crates.
//!
//! # Module Structure
//!
//! - [`hal`] - Register codec and hardware channel trait
//! - [`protocol`] - Control connection command tags and framing
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide constants and default paths
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use petra_common::hal::registers::{Actuators, RollerArmPosition};
//!
//! let mut actuators = Actuators::decode(0);
//! actuators.roller1 = true;
//! actuators.roller_arm = RollerArmPosition::Both;
//! assert_eq!(actuators.encode(), 0b0110_0000);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod protocol;
