//! End-to-end sessions over localhost TCP against the simulated bench.
//!
//! Each test binds both listeners on ephemeral ports, connects a control
//! and a telemetry client, and drives the server through the wire
//! protocol only.

use petra_common::config::PetraConfig;
use petra_common::protocol::{Command, encode_frame};
use petra_server::drivers::simulation::{SimulatedChannel, SimulationProbe};
use petra_server::processor::StopReason;
use petra_server::server::SessionReport;
use petra_server::{PetraServer, ServerResult};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Harness {
    control: TcpStream,
    telemetry: TcpStream,
    probe: SimulationProbe,
    server: JoinHandle<ServerResult<SessionReport>>,
    teardown: std::sync::Arc<petra_server::Teardown>,
}

fn test_config() -> PetraConfig {
    let mut config = PetraConfig::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.control_port = 0;
    config.server.telemetry_port = Some(0);
    config.poller.interval_ms = 10;
    config
}

fn start() -> Harness {
    let (channel, probe) = SimulatedChannel::new();
    let server = PetraServer::with_channel(test_config(), Box::new(channel)).expect("open server");
    let bound = server.bind().expect("bind listeners");
    let control_addr = bound.control_addr().expect("control addr");
    let telemetry_addr = bound.telemetry_addr().expect("telemetry addr");
    let teardown = bound.teardown_handle();

    let server = thread::spawn(move || bound.serve());

    let control = TcpStream::connect(control_addr).expect("connect control");
    let telemetry = TcpStream::connect(telemetry_addr).expect("connect telemetry");
    control
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("control timeout");
    telemetry
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("telemetry timeout");

    Harness {
        control,
        telemetry,
        probe,
        server,
        teardown,
    }
}

impl Harness {
    fn send(&mut self, command: Command) -> u8 {
        self.send_tag(command.tag())
    }

    fn send_tag(&mut self, tag: i32) -> u8 {
        self.control
            .write_all(&tag.to_le_bytes())
            .expect("send command");
        let mut ack = [0u8; 1];
        self.control.read_exact(&mut ack).expect("receive ack");
        ack[0]
    }

    fn finish(mut self) -> (SessionReport, SimulationProbe) {
        self.control
            .write_all(&encode_frame(Command::Exit))
            .expect("send exit");
        let mut ack = [0u8; 1];
        self.control.read_exact(&mut ack).expect("exit ack");
        let report = self
            .server
            .join()
            .expect("server thread")
            .expect("session result");
        (report, self.probe)
    }
}

#[test]
fn roller1_with_auto_commit_writes_and_acks() {
    let mut h = start();
    assert_eq!(h.send(Command::Roller1), 0b0010_0000);
    // Startup reset, then exactly one write for the toggle.
    assert_eq!(h.probe.writes(), vec![0, 0b0010_0000]);

    let (report, _) = h.finish();
    assert_eq!(report.processor.commands, 2);
    assert_eq!(report.processor.commits, 1);
}

#[test]
fn manual_mode_defers_write_until_commit() {
    let mut h = start();
    assert_eq!(h.send(Command::AutoCommit), 0);
    assert_eq!(h.send(Command::Roller1), 0b0010_0000);
    assert_eq!(h.probe.write_count(), 1);

    assert_eq!(h.send(Command::Commit), 0b0010_0000);
    assert_eq!(h.probe.writes(), vec![0, 0b0010_0000]);

    h.finish();
}

#[test]
fn reenabled_auto_commit_flushes_on_next_change() {
    let mut h = start();
    assert_eq!(h.send(Command::AutoCommit), 0);
    assert_eq!(h.send(Command::Roller1), 0b0010_0000);
    assert_eq!(h.send(Command::AutoCommit), 0b0010_0000);
    // Re-enabling alone does not write.
    assert_eq!(h.probe.write_count(), 1);

    assert_eq!(h.send(Command::Arm), 0b0010_0010);
    assert_eq!(h.probe.writes(), vec![0, 0b0010_0010]);

    h.finish();
}

#[test]
fn commit_in_auto_mode_writes_twice() {
    let mut h = start();
    assert_eq!(h.send(Command::Blocker), 0b0000_0001);
    assert_eq!(h.send(Command::Commit), 0b0000_0001);
    assert_eq!(h.probe.writes(), vec![0, 0b0000_0001, 0b0000_0001, 0b0000_0001]);

    let (report, _) = h.finish();
    assert_eq!(report.processor.commits, 3);
}

#[test]
fn roller_arm_both_sets_top_bits() {
    let mut h = start();
    assert_eq!(h.send(Command::Blocker), 0b0000_0001);
    assert_eq!(h.send(Command::ArmR1R2), 0b0100_0001);
    assert_eq!(h.send(Command::ArmR2), 0b1100_0001);
    assert_eq!(h.send(Command::ArmNeutral), 0b0000_0001);
    h.finish();
}

#[test]
fn unknown_tag_is_acked_without_write() {
    let mut h = start();
    h.send(Command::Arm);
    let writes = h.probe.write_count();
    assert_eq!(h.send_tag(42), 0b0000_0010);
    assert_eq!(h.send_tag(-1), 0b0000_0010);
    assert_eq!(h.probe.write_count(), writes);
    h.finish();
}

#[test]
fn exit_stops_poller_and_resets() {
    let mut h = start();
    h.send(Command::Roller2);
    h.send(Command::Tub);

    let (report, probe) = h.finish();
    assert_eq!(report.processor.reason, StopReason::Exit);
    assert!(report.processor.poller.is_some());
    assert_eq!(probe.last_write(), Some(0));
}

#[test]
fn telemetry_streams_sensor_byte() {
    let mut h = start();
    h.probe.set_mirror(false);
    h.probe.set_sensors(0b1010_0101);

    // Bytes already in flight may still carry the initial value.
    let mut seen = 0;
    let mut byte = [0u8; 1];
    for _ in 0..100 {
        h.telemetry.read_exact(&mut byte).expect("telemetry byte");
        if byte[0] == 0b1010_0101 {
            seen += 1;
            if seen == 3 {
                break;
            }
        }
    }
    assert_eq!(seen, 3);
    h.finish();
}

#[test]
fn telemetry_ends_after_exit() {
    let mut h = start();
    h.send(Command::NoOp);
    let mut telemetry = h.telemetry.try_clone().expect("clone telemetry");
    h.finish();

    // Drain whatever was sent before the stop; the stream must then close.
    let mut rest = Vec::new();
    telemetry.read_to_end(&mut rest).expect("telemetry closed");
}

#[test]
fn interrupt_teardown_is_idempotent() {
    let mut h = start();
    h.send(Command::Roller1);
    h.send(Command::Arm);

    h.teardown.run().expect("first teardown");
    h.teardown.run().expect("second teardown");
    assert_eq!(h.probe.last_write(), Some(0));

    // Sockets were shut down under the processor: it sees a disconnect.
    let report = h
        .server
        .join()
        .expect("server thread")
        .expect("session result");
    assert_eq!(report.processor.reason, StopReason::ClientDisconnected);
    assert_eq!(h.probe.last_write(), Some(0));
}
