//! Error types for the PETRA server.
//!
//! `ChannelError` (hardware) lives in `petra_common`; this module adds the
//! network side and the aggregate returned by the lifecycle controller.

use petra_common::config::ConfigError;
use petra_common::hal::driver::ChannelError;
use std::io;
use thiserror::Error;

/// Socket failures on the control or telemetry connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Listener could not bind
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// Accepting a client failed
    #[error("Accept failed on {link} listener: {source}")]
    Accept {
        /// Which listener
        link: &'static str,
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// Sending to the client failed
    #[error("Send failed on {link} connection: {source}")]
    Send {
        /// Which connection
        link: &'static str,
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// Receiving from the client failed
    #[error("Receive failed on {link} connection: {source}")]
    Receive {
        /// Which connection
        link: &'static str,
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// Peer closed the connection
    #[error("{link} client disconnected")]
    Closed {
        /// Which connection
        link: &'static str,
    },

    /// Socket option could not be applied
    #[error("Socket setup failed on {link} connection: {source}")]
    Setup {
        /// Which connection
        link: &'static str,
        /// Source IO error
        #[source]
        source: io::Error,
    },
}

/// Errors that end a PETRA session.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Hardware channel failure
    #[error("Hardware channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Network failure
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sensor poller thread could not be started
    #[error("Cannot spawn sensor poller: {source}")]
    Spawn {
        /// Source IO error
        #[source]
        source: io::Error,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;
