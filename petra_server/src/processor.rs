//! Command processor.
//!
//! Two states, RUNNING and STOPPED (terminal). Each iteration receives one
//! command tag, applies it to the device session under the lock, commits
//! to hardware when required, releases the lock and acknowledges with the
//! resulting actuator byte.
//!
//! Commit rules:
//!
//! | Command             | Register          | Hardware write                   |
//! |---------------------|-------------------|----------------------------------|
//! | toggles / select    | mutated           | if auto-commit is on             |
//! | `Sucker`            | sucker set        | if auto-commit is on             |
//! | `AutoCommit`        | untouched         | never (flips the mode)           |
//! | `Commit`            | untouched         | always, plus auto-commit if on   |
//! | `NoOp`, unknown tag | untouched         | never                            |
//! | `Exit`              | untouched         | never, processor stops           |
//!
//! Every processed command is acknowledged, `Exit` included. On STOPPED
//! the processor stops the sensor poller and joins it before returning.
//! A command that finds the session sealed by teardown is dropped and the
//! processor stops.

use petra_common::hal::driver::ChannelError;
use petra_common::protocol::Command;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::ConnectionError;
use crate::link;
use crate::poller::{PollerHandle, PollerReport};
use crate::session::DeviceSession;

/// Processor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Accepting commands.
    Running,
    /// Terminal.
    Stopped,
}

/// Why the processor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Client sent `Exit`.
    Exit,
    /// Control client closed the connection.
    ClientDisconnected,
    /// Receiving a command failed.
    ReceiveFailed,
    /// Sending an acknowledgement failed.
    AckFailed,
    /// Hardware write failed.
    ChannelFailed,
    /// Teardown sealed the session.
    SessionClosed,
}

/// Result of applying one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// Actuator byte to acknowledge with.
    pub ack: u8,
    /// Hardware writes issued for this command (0, 1 or 2).
    pub writes: u8,
}

impl Applied {
    /// Whether the actuator byte went to hardware at least once.
    pub fn committed(&self) -> bool {
        self.writes > 0
    }
}

/// Summary returned when the processor stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorReport {
    /// Commands received and processed.
    pub commands: u64,
    /// Hardware writes issued by commands. `Commit` in auto-commit mode
    /// counts twice.
    pub commits: u64,
    /// Why the processor stopped.
    pub reason: StopReason,
    /// Final report of the sensor poller, if this processor joined it.
    pub poller: Option<PollerReport>,
}

/// Applies client commands to the device session.
pub struct CommandProcessor<L> {
    session: Arc<DeviceSession>,
    link: L,
    auto_commit: bool,
    state: ProcessorState,
    poller: Option<PollerHandle>,
    commands: u64,
    commits: u64,
}

impl<L: Read + Write> CommandProcessor<L> {
    /// Create a processor in RUNNING state.
    pub fn new(session: Arc<DeviceSession>, link: L, auto_commit: bool) -> Self {
        Self {
            session,
            link,
            auto_commit,
            state: ProcessorState::Running,
            poller: None,
            commands: 0,
            commits: 0,
        }
    }

    /// Poller to stop and join when this processor stops.
    pub fn with_poller(mut self, poller: PollerHandle) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Current auto-commit mode.
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Current state.
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Apply one command in a single critical section.
    ///
    /// The lock is released before returning; the caller sends the ack.
    /// A sealed session rejects the command before anything is mutated.
    pub fn apply(&mut self, command: Command) -> Result<Applied, ChannelError> {
        let mut state = self.session.lock();
        if state.is_sealed() {
            return Err(ChannelError::SessionClosed {
                operation: "command",
            });
        }
        state.apply(command);

        let mut writes = 0u8;
        match command {
            Command::AutoCommit => {
                self.auto_commit = !self.auto_commit;
                info!("Auto-commit {}", if self.auto_commit { "on" } else { "off" });
            }
            Command::Commit => {
                state.commit()?;
                writes += 1;
                debug!("Forced commit write");
            }
            Command::Exit => {
                info!("Exit requested");
                self.state = ProcessorState::Stopped;
            }
            _ => {}
        }

        if self.auto_commit && command.is_state_changing() {
            state.commit()?;
            writes += 1;
            debug!("Auto-commit write");
        }

        let ack = state.actuator_byte();
        drop(state);

        self.commits += u64::from(writes);
        debug!("{:?} -> actuators {:08b}", command, ack);
        Ok(Applied { ack, writes })
    }

    /// Receive and process commands until STOPPED.
    pub fn run(mut self) -> ProcessorReport {
        info!(
            "Command processor started (auto_commit={})",
            self.auto_commit
        );

        let reason = loop {
            let tag = match link::receive_tag(&mut self.link) {
                Ok(tag) => tag,
                Err(ConnectionError::Closed { .. }) => {
                    info!("Control client disconnected");
                    break StopReason::ClientDisconnected;
                }
                Err(e) => {
                    error!("{e}");
                    break StopReason::ReceiveFailed;
                }
            };

            let command = Command::from_tag(tag).unwrap_or_else(|| {
                warn!("Ignoring unknown command tag {tag}");
                Command::NoOp
            });

            let applied = match self.apply(command) {
                Ok(applied) => applied,
                Err(ChannelError::SessionClosed { .. }) => {
                    info!("Session closed, dropping {:?}", command);
                    break StopReason::SessionClosed;
                }
                Err(e) => {
                    error!("{:?} failed: {e}", command);
                    break StopReason::ChannelFailed;
                }
            };
            self.commands += 1;

            if let Err(e) = link::send_ack(&mut self.link, applied.ack) {
                error!("{e}");
                break StopReason::AckFailed;
            }

            if self.state == ProcessorState::Stopped {
                break StopReason::Exit;
            }
        };

        self.state = ProcessorState::Stopped;
        let poller = self.poller.take().and_then(|p| p.stop_and_join());
        info!(
            "Command processor stopped ({:?}) after {} commands, {} commits",
            reason, self.commands, self.commits
        );

        ProcessorReport {
            commands: self.commands,
            commits: self.commits,
            reason,
            poller,
        }
    }
}
