//! Hardware channel trait and error types.
//!
//! This module defines:
//! - `HardwareChannel` trait - Interface for pluggable PETRA drivers
//! - `ChannelError` enum - Error types for channel operations
//! - `ChannelFactory` type alias - Factory function type

use crate::config::DeviceConfig;
use std::io;
use thiserror::Error;

/// Error types for hardware channel operations.
///
/// Every variant is fatal to the loop that hit it. The register held in
/// memory keeps its last known value.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A device endpoint could not be opened
    #[error("Cannot open device {path}: {source}")]
    Open {
        /// Device path
        path: String,
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// Reading the sensor byte failed
    #[error("Sensor read failed: {source}")]
    Read {
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// Writing the actuator byte failed
    #[error("Actuator write failed: {source}")]
    Write {
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// The device transferred zero bytes
    #[error("Device reached end of stream during {operation}")]
    EndOfStream {
        /// Operation that hit end of stream
        operation: &'static str,
    },

    /// The session was torn down; hardware writes are refused
    #[error("Device session closed, {operation} refused")]
    SessionClosed {
        /// Operation that was refused
        operation: &'static str,
    },

    /// No driver registered under this name
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Factory function type for opening a driver's channel pair.
pub type ChannelFactory = fn(&DeviceConfig) -> Result<Box<dyn HardwareChannel>, ChannelError>;

/// A pair of one-byte device endpoints: sensor input and actuator output.
///
/// Implementations perform exactly one blocking transfer per call and do no
/// buffering beyond that byte. Callers serialize access; the trait takes
/// `&mut self` and is only required to be `Send`.
///
/// # Lifecycle
///
/// 1. Factory - Opens both endpoints or fails with `ChannelError::Open`
/// 2. `read_byte()` / `write_byte()` - Called under the session lock
/// 3. `shutdown()` - Called once at teardown, endpoints close on drop
pub trait HardwareChannel: Send {
    /// Returns the driver's unique identifier (e.g., "device", "simulation").
    fn name(&self) -> &'static str;

    /// Read one sensor byte.
    fn read_byte(&mut self) -> Result<u8, ChannelError>;

    /// Write one actuator byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), ChannelError>;

    /// Release the endpoints.
    /// Default: No-op, endpoints close when the channel is dropped
    fn shutdown(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LoopbackChannel {
        last: u8,
    }

    impl HardwareChannel for LoopbackChannel {
        fn name(&self) -> &'static str {
            "loopback"
        }

        fn read_byte(&mut self) -> Result<u8, ChannelError> {
            Ok(self.last)
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
            self.last = byte;
            Ok(())
        }
    }

    #[test]
    fn test_channel_error_display() {
        let err = ChannelError::Open {
            path: "/dev/capteursPETRA".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/dev/capteursPETRA"));

        let err = ChannelError::EndOfStream { operation: "read" };
        assert!(err.to_string().contains("read"));

        let err = ChannelError::SessionClosed { operation: "commit" };
        assert!(err.to_string().contains("closed"));

        let err = ChannelError::DriverNotFound("ethercat".to_string());
        assert!(err.to_string().contains("ethercat"));
    }

    #[test]
    fn test_trait_object_round_trip() {
        let mut channel: Box<dyn HardwareChannel> = Box::new(LoopbackChannel { last: 0 });
        channel.write_byte(0x42).unwrap();
        assert_eq!(channel.read_byte().unwrap(), 0x42);
        assert!(channel.shutdown().is_ok());
        assert_eq!(channel.name(), "loopback");
    }
}
