//! System-wide constants for the PETRA workspace.
//!
//! Single source of truth for default device paths, ports and timings.

/// Default sensor device (read-only, one byte per read).
pub const DEFAULT_SENSORS_DEVICE: &str = "/dev/capteursPETRA";

/// Default actuator device (write-only, one byte per write).
pub const DEFAULT_ACTUATORS_DEVICE: &str = "/dev/actuateursPETRA";

/// Default address the control and telemetry listeners bind to.
pub const DEFAULT_BIND_ADDRESS: &str = "10.59.28.2";

/// Default control connection port. Telemetry uses the next port.
pub const DEFAULT_CONTROL_PORT: u16 = 50000;

/// Default sensor polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default telemetry socket write timeout in milliseconds.
pub const DEFAULT_TELEMETRY_SEND_TIMEOUT_MS: u64 = 1000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/petra/petra.toml";

/// Size of one command frame on the control connection.
pub const COMMAND_FRAME_LEN: usize = 4;

/// Actuator byte written at startup, shutdown and on interruption.
pub const SAFE_ACTUATOR_STATE: u8 = 0x00;
