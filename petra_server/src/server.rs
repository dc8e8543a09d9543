//! Lifecycle controller.
//!
//! `PetraServer` sequences one session:
//!
//! 1. Open both hardware endpoints (fatal on failure)
//! 2. Reset actuators to zero
//! 3. Bind control and telemetry listeners, accept one client on each
//! 4. Start the sensor poller, run the command processor until STOPPED
//! 5. Teardown: stop poller, reset actuators, close sockets and devices
//!
//! [`Teardown`] is the shared, idempotent form of step 5. The interrupt
//! handler runs the same teardown out of band and then exits the process.

use parking_lot::Mutex;
use petra_common::config::PetraConfig;
use petra_common::hal::driver::{ChannelError, HardwareChannel};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::driver_registry::DriverRegistry;
use crate::error::ServerResult;
use crate::link::{self, CONTROL, TELEMETRY};
use crate::poller::{PollerHandle, SensorPoller};
use crate::processor::{CommandProcessor, ProcessorReport};
use crate::session::DeviceSession;

/// Shared teardown: everything needed to return the bench to a safe state.
pub struct Teardown {
    session: Arc<DeviceSession>,
    poller: Mutex<Option<PollerHandle>>,
    links: Mutex<Vec<TcpStream>>,
}

impl Teardown {
    fn new(session: Arc<DeviceSession>) -> Self {
        Self {
            session,
            poller: Mutex::new(None),
            links: Mutex::new(Vec::new()),
        }
    }

    fn attach_poller(&self, poller: PollerHandle) {
        *self.poller.lock() = Some(poller);
    }

    fn attach_link(&self, stream: &TcpStream) {
        match stream.try_clone() {
            Ok(clone) => self.links.lock().push(clone),
            Err(e) => warn!("Cannot track socket for teardown: {e}"),
        }
    }

    /// Stop and join the poller, reset and seal the session, close client
    /// sockets.
    ///
    /// Safe to call any number of times from any thread. The reset is
    /// attempted on every call. Once sealed, a command that was already
    /// waiting for the session lock can no longer write to hardware.
    pub fn run(&self) -> Result<(), ChannelError> {
        let poller = self.poller.lock().clone();
        if let Some(poller) = poller {
            poller.stop_and_join();
        }

        let reset = self.session.seal_and_reset();
        match &reset {
            Ok(()) => info!("Actuators reset to safe state"),
            Err(e) => error!("Safe-state reset failed: {e}"),
        }

        for stream in self.links.lock().drain(..) {
            link::close(&stream);
        }
        reset
    }
}

/// Outcome of one served session.
#[derive(Debug, Clone, Copy)]
pub struct SessionReport {
    /// Command processor summary.
    pub processor: ProcessorReport,
}

/// A session with its hardware open and reset.
pub struct PetraServer {
    config: PetraConfig,
    session: Arc<DeviceSession>,
    teardown: Arc<Teardown>,
}

impl PetraServer {
    /// Validate the configuration and open the configured driver.
    pub fn open(config: PetraConfig, registry: &DriverRegistry) -> ServerResult<Self> {
        config.validate()?;
        let channel = registry.open(&config.devices)?;
        Self::with_channel(config, channel)
    }

    /// Build a session around an already opened channel and reset it.
    pub fn with_channel(
        config: PetraConfig,
        channel: Box<dyn HardwareChannel>,
    ) -> ServerResult<Self> {
        let session = Arc::new(DeviceSession::new(channel));
        session.reset_to_zero()?;
        info!(
            "{}: '{}' session ready, actuators at safe state",
            config.shared.service_name,
            session.driver_name()
        );
        let teardown = Arc::new(Teardown::new(Arc::clone(&session)));
        Ok(Self {
            config,
            session,
            teardown,
        })
    }

    /// The device session.
    pub fn session(&self) -> Arc<DeviceSession> {
        Arc::clone(&self.session)
    }

    /// Teardown handle for the interrupt handler.
    pub fn teardown_handle(&self) -> Arc<Teardown> {
        Arc::clone(&self.teardown)
    }

    /// Bind both listeners.
    ///
    /// On failure the actuators are reset and the channel released.
    pub fn bind(self) -> ServerResult<BoundServer> {
        let server = &self.config.server;
        let listeners = link::bind(&server.bind_address, server.control_port).and_then(|control| {
            link::bind(&server.bind_address, server.telemetry_port())
                .map(|telemetry| (control, telemetry))
        });
        match listeners {
            Ok((control, telemetry)) => Ok(BoundServer {
                server: self,
                control,
                telemetry,
            }),
            Err(e) => {
                self.close();
                Err(e.into())
            }
        }
    }

    /// Final teardown and channel release.
    fn close(&self) {
        // Reset errors are already logged by the teardown.
        let _ = self.teardown.run();
        if let Err(e) = self.session.shutdown() {
            warn!("Channel shutdown failed: {e}");
        }
    }
}

/// A server with both listeners bound, ready to accept its clients.
pub struct BoundServer {
    server: PetraServer,
    control: TcpListener,
    telemetry: TcpListener,
}

impl BoundServer {
    /// Local address of the control listener.
    pub fn control_addr(&self) -> io::Result<SocketAddr> {
        self.control.local_addr()
    }

    /// Local address of the telemetry listener.
    pub fn telemetry_addr(&self) -> io::Result<SocketAddr> {
        self.telemetry.local_addr()
    }

    /// Teardown handle for the interrupt handler.
    pub fn teardown_handle(&self) -> Arc<Teardown> {
        self.server.teardown_handle()
    }

    /// Accept both clients and run the session to completion.
    ///
    /// Teardown runs on every exit path, including accept failures.
    pub fn serve(self) -> ServerResult<SessionReport> {
        let result = self.run_session();
        self.server.close();
        let report = result?;
        info!("Session closed");
        Ok(report)
    }

    fn run_session(&self) -> ServerResult<SessionReport> {
        let config = &self.server.config;
        let teardown = &self.server.teardown;
        let session = &self.server.session;

        let control = link::accept(&self.control, CONTROL)?;
        teardown.attach_link(&control);

        let telemetry = link::accept(&self.telemetry, TELEMETRY)?;
        link::set_send_timeout(&telemetry, config.server.telemetry_send_timeout())?;
        teardown.attach_link(&telemetry);

        let poller = SensorPoller::new(Arc::clone(session), telemetry, config.poller.interval())
            .spawn()?;
        teardown.attach_poller(poller.clone());

        let processor = CommandProcessor::new(
            Arc::clone(session),
            control,
            config.processor.auto_commit,
        )
        .with_poller(poller);

        let report = processor.run();
        Ok(SessionReport { processor: report })
    }
}
