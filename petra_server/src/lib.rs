//! # PETRA Server Library
//!
//! Remote control of the PETRA bench over two TCP connections: commands in
//! on the control connection, sensor bytes out on the telemetry connection.
//! Hardware access goes through a `HardwareChannel` from
//! `petra_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`session`] - Shared device state and its lock
//! - [`processor`] - Command processor and commit semantics
//! - [`poller`] - Sensor poller and its stop signal
//! - [`server`] - Lifecycle controller and teardown
//! - [`link`] - Listener setup and command framing
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Channel driver implementations
//! - [`error`] - Connection and server errors
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                       petra_server                                │
//! │  control ──► ┌──────────────────┐        ┌──────────────────────┐ │
//! │  client  ◄── │ CommandProcessor │──┐     │  HardwareChannel     │ │
//! │              └──────────────────┘  │     │  (device/simulation) │ │
//! │                                    ▼     └──────────▲───────────┘ │
//! │                          ┌───────────────────┐      │             │
//! │                          │ DeviceSession     │──────┘             │
//! │                          │ (Mutex<State>)    │                    │
//! │                          └───────────────────┘                    │
//! │                                    ▲                              │
//! │  telemetry ◄── ┌──────────────┐    │                              │
//! │  client        │ SensorPoller │────┘                              │
//! │                └──────────────┘                                   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod link;
pub mod poller;
pub mod processor;
pub mod server;
pub mod session;

// Re-export key types for convenience
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::{ConnectionError, ServerError, ServerResult};
pub use crate::poller::{PollerHandle, SensorPoller, StopSignal};
pub use crate::processor::{CommandProcessor, ProcessorReport, StopReason};
pub use crate::server::{BoundServer, PetraServer, SessionReport, Teardown};
pub use crate::session::DeviceSession;
