//! Simulation channel implementation.
//!
//! `SimulatedChannel` implements `HardwareChannel` in memory so the server
//! can run without the PETRA devices. A `SimulationProbe` shares the same
//! state and lets tests inspect writes, set sensors and inject failures.
//! Only a channel created with a probe keeps the log of written bytes;
//! [`SimulatedChannel::unprobed`] just counts them.

use super::io::BenchModel;
use parking_lot::Mutex;
use petra_common::hal::driver::{ChannelError, HardwareChannel};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct SimState {
    bench: BenchModel,
    recording: bool,
    written: Vec<u8>,
    writes: usize,
    reads: u64,
    fail_reads: bool,
    fail_writes: bool,
    transfer_delay: Option<Duration>,
}

/// In-memory PETRA channel.
pub struct SimulatedChannel {
    state: Arc<Mutex<SimState>>,
    /// Set while a transfer is in progress
    busy: Arc<AtomicBool>,
    /// Set if two transfers ever overlapped
    overlap: Arc<AtomicBool>,
}

/// Test-side handle onto a `SimulatedChannel`.
#[derive(Clone)]
pub struct SimulationProbe {
    state: Arc<Mutex<SimState>>,
    overlap: Arc<AtomicBool>,
}

impl SimulatedChannel {
    /// Create a channel and its probe.
    pub fn new() -> (Self, SimulationProbe) {
        let channel = Self::with_recording(true);
        let probe = SimulationProbe {
            state: Arc::clone(&channel.state),
            overlap: Arc::clone(&channel.overlap),
        };
        (channel, probe)
    }

    /// Create a channel nobody inspects. Writes are counted, not logged.
    pub fn unprobed() -> Self {
        Self::with_recording(false)
    }

    fn with_recording(recording: bool) -> Self {
        let state = SimState {
            recording,
            ..SimState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            busy: Arc::new(AtomicBool::new(false)),
            overlap: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the channel busy for one transfer, recording any overlap.
    fn enter(&self) {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlap.store(true, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl HardwareChannel for SimulatedChannel {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn read_byte(&mut self) -> Result<u8, ChannelError> {
        self.enter();
        let delay = self.state.lock().transfer_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let result = {
            let mut sim = self.state.lock();
            if sim.fail_reads {
                Err(ChannelError::Read {
                    source: io::Error::other("simulated read failure"),
                })
            } else {
                sim.reads += 1;
                Ok(sim.bench.sensors())
            }
        };
        self.leave();
        result
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
        self.enter();
        let delay = self.state.lock().transfer_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let result = {
            let mut sim = self.state.lock();
            if sim.fail_writes {
                Err(ChannelError::Write {
                    source: io::Error::other("simulated write failure"),
                })
            } else {
                if sim.recording {
                    sim.written.push(byte);
                }
                sim.writes += 1;
                sim.bench.on_actuators(byte);
                Ok(())
            }
        };
        self.leave();
        result
    }

    fn shutdown(&mut self) -> Result<(), ChannelError> {
        let sim = self.state.lock();
        info!(
            "Simulation channel closed after {} writes, {} reads",
            sim.writes,
            sim.reads
        );
        Ok(())
    }
}

impl SimulationProbe {
    /// Every byte written so far, oldest first.
    pub fn writes(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    /// Number of writes so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Last written byte.
    pub fn last_write(&self) -> Option<u8> {
        self.state.lock().written.last().copied()
    }

    /// Number of successful reads so far.
    pub fn read_count(&self) -> u64 {
        self.state.lock().reads
    }

    /// Set the sensor byte returned by the next reads.
    pub fn set_sensors(&self, byte: u8) {
        self.state.lock().bench.set_sensors(byte);
    }

    /// Enable or disable arm/diver sensors following the actuators.
    pub fn set_mirror(&self, enabled: bool) {
        self.state.lock().bench.set_linked(enabled);
    }

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        debug!("Simulated read failures: {fail}");
        self.state.lock().fail_reads = fail;
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        debug!("Simulated write failures: {fail}");
        self.state.lock().fail_writes = fail;
    }

    /// Sleep this long inside every transfer.
    pub fn set_transfer_delay(&self, delay: Option<Duration>) {
        self.state.lock().transfer_delay = delay;
    }

    /// True if two transfers were ever in progress at the same time.
    pub fn overlap_detected(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_writes_and_serves_sensors() {
        let (mut channel, probe) = SimulatedChannel::new();
        probe.set_mirror(false);
        probe.set_sensors(0x81);
        channel.write_byte(0x20).unwrap();
        channel.write_byte(0x00).unwrap();
        assert_eq!(channel.read_byte().unwrap(), 0x81);
        assert_eq!(probe.writes(), vec![0x20, 0x00]);
        assert_eq!(probe.read_count(), 1);
        assert!(!probe.overlap_detected());
    }

    #[test]
    fn injected_failures() {
        let (mut channel, probe) = SimulatedChannel::new();
        probe.fail_writes(true);
        assert!(matches!(
            channel.write_byte(1),
            Err(ChannelError::Write { .. })
        ));
        probe.fail_reads(true);
        assert!(matches!(channel.read_byte(), Err(ChannelError::Read { .. })));
        assert_eq!(probe.write_count(), 0);
    }

    #[test]
    fn unprobed_channel_keeps_no_log() {
        let mut channel = SimulatedChannel::unprobed();
        for i in 0..1000u32 {
            channel.write_byte(i as u8).unwrap();
        }
        let sim = channel.state.lock();
        assert!(sim.written.is_empty());
        assert_eq!(sim.writes, 1000);
    }

    #[test]
    fn mirror_links_arm_sensor() {
        let (mut channel, _probe) = SimulatedChannel::new();
        channel.write_byte(0b0000_0010).unwrap();
        assert_eq!(channel.read_byte().unwrap(), 0b0000_0100);
    }
}
