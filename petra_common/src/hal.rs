//! Hardware abstraction: register codec and channel trait.
//!
//! The PETRA apparatus exposes two one-byte device endpoints. This module
//! describes what travels over them ([`registers`]) and how a driver moves
//! it ([`driver`]).

pub mod driver;
pub mod registers;
