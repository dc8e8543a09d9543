//! Character-device driver.
//!
//! Opens the PETRA sensor device read-only and the actuator device
//! write-only. Each transfer moves exactly one byte; there is no framing.

use petra_common::config::DeviceConfig;
use petra_common::hal::driver::{ChannelError, HardwareChannel};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Sensor input and actuator output device files.
pub struct DeviceChannel {
    input: File,
    output: File,
}

impl DeviceChannel {
    /// Open both endpoints. Fails on whichever path cannot be opened; the
    /// input is closed again if the output fails.
    pub fn open(sensors: &Path, actuators: &Path) -> Result<Self, ChannelError> {
        let input = OpenOptions::new()
            .read(true)
            .open(sensors)
            .map_err(|source| ChannelError::Open {
                path: sensors.display().to_string(),
                source,
            })?;
        let output = OpenOptions::new()
            .write(true)
            .open(actuators)
            .map_err(|source| ChannelError::Open {
                path: actuators.display().to_string(),
                source,
            })?;
        info!(
            "Opened PETRA devices: in={} out={}",
            sensors.display(),
            actuators.display()
        );
        Ok(Self { input, output })
    }
}

impl HardwareChannel for DeviceChannel {
    fn name(&self) -> &'static str {
        "device"
    }

    fn read_byte(&mut self) -> Result<u8, ChannelError> {
        let mut buf = [0u8; 1];
        self.input.read_exact(&mut buf).map_err(|source| {
            if source.kind() == io::ErrorKind::UnexpectedEof {
                ChannelError::EndOfStream { operation: "read" }
            } else {
                ChannelError::Read { source }
            }
        })?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
        self.output.write_all(&[byte]).map_err(|source| {
            if source.kind() == io::ErrorKind::WriteZero {
                ChannelError::EndOfStream { operation: "write" }
            } else {
                ChannelError::Write { source }
            }
        })
    }

    fn shutdown(&mut self) -> Result<(), ChannelError> {
        self.output
            .flush()
            .map_err(|source| ChannelError::Write { source })?;
        debug!("PETRA devices released");
        Ok(())
    }
}

/// Factory function registered as "device".
pub fn create_driver(config: &DeviceConfig) -> Result<Box<dyn HardwareChannel>, ChannelError> {
    let channel = DeviceChannel::open(
        Path::new(&config.sensors),
        Path::new(&config.actuators),
    )?;
    Ok(Box::new(channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_and_writes_single_bytes() {
        let tmp = TempDir::new().unwrap();
        let sensors = tmp.path().join("capteurs");
        let actuators = tmp.path().join("actuateurs");
        fs::write(&sensors, [0b1000_0001u8, 0b0000_0100]).unwrap();
        fs::write(&actuators, b"").unwrap();

        let mut channel = DeviceChannel::open(&sensors, &actuators).unwrap();
        assert_eq!(channel.read_byte().unwrap(), 0b1000_0001);
        assert_eq!(channel.read_byte().unwrap(), 0b0000_0100);
        assert!(matches!(
            channel.read_byte(),
            Err(ChannelError::EndOfStream { .. })
        ));

        channel.write_byte(0x40).unwrap();
        channel.write_byte(0x00).unwrap();
        channel.shutdown().unwrap();
        assert_eq!(fs::read(&actuators).unwrap(), vec![0x40, 0x00]);
    }

    #[test]
    fn missing_device_names_path() {
        let tmp = TempDir::new().unwrap();
        let sensors = tmp.path().join("capteurs");
        fs::write(&sensors, [0u8]).unwrap();
        let missing = tmp.path().join("nope");

        match DeviceChannel::open(&sensors, &missing) {
            Err(ChannelError::Open { path, .. }) => assert!(path.ends_with("nope")),
            other => panic!("expected open error, got {:?}", other.map(|_| ())),
        }
        match DeviceChannel::open(&missing, &sensors) {
            Err(ChannelError::Open { path, .. }) => assert!(path.ends_with("nope")),
            other => panic!("expected open error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn factory_uses_config_paths() {
        let config = DeviceConfig {
            driver: "device".to_string(),
            sensors: "/nonexistent/capteursPETRA".to_string(),
            actuators: "/nonexistent/actuateursPETRA".to_string(),
        };
        assert!(matches!(
            create_driver(&config),
            Err(ChannelError::Open { .. })
        ));
    }
}
