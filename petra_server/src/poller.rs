//! Sensor poller.
//!
//! Runs on its own thread from session start until asked to stop: read the
//! sensor byte under the session lock, push it to the telemetry client,
//! wait one interval. A failed read or a failed send ends the loop; there
//! is no reconnection.
//!
//! Cancellation is cooperative. The poller checks its [`StopSignal`] after
//! every blocking step and the interval wait wakes early on a stop request.
//! Whoever stops it joins the thread before tearing anything down.

use parking_lot::{Condvar, Mutex};
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::error::{ServerError, ServerResult};
use crate::session::DeviceSession;

/// Shared stop request, observable and waitable.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    /// New, not yet requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request stop and wake any waiter.
    pub fn request_stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }

    /// True once stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Wait up to `timeout`. Returns `true` if stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut stopped = lock.lock();
        while !*stopped {
            if cvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Why the poller loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerStop {
    /// Stop was requested.
    Requested,
    /// Hardware read failed.
    ChannelFailed,
    /// Telemetry client went away.
    TelemetryClosed,
}

/// Summary returned when the poller thread ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerReport {
    /// Sensor bytes delivered to the client.
    pub sent: u64,
    /// Why the loop ended.
    pub stop: PollerStop,
}

/// Sensor polling loop over any telemetry sink.
pub struct SensorPoller<W> {
    session: Arc<DeviceSession>,
    telemetry: W,
    interval: Duration,
    stop: StopSignal,
}

impl<W: Write> SensorPoller<W> {
    /// Create a poller with a fresh stop signal.
    pub fn new(session: Arc<DeviceSession>, telemetry: W, interval: Duration) -> Self {
        Self {
            session,
            telemetry,
            interval,
            stop: StopSignal::new(),
        }
    }

    /// Signal observed by this poller.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run the loop on the calling thread.
    pub fn run(mut self) -> PollerReport {
        info!("Sensor poller started (interval={:?})", self.interval);
        let mut sent = 0u64;

        let stop = loop {
            if self.stop.is_stopped() {
                break PollerStop::Requested;
            }

            let byte = match self.session.poll_sensors() {
                Ok(byte) => byte,
                Err(e) => {
                    error!("Sensor poller: {e}");
                    break PollerStop::ChannelFailed;
                }
            };

            // A stop that arrived during the read suppresses the send.
            if self.stop.is_stopped() {
                break PollerStop::Requested;
            }

            if let Err(e) = self
                .telemetry
                .write_all(&[byte])
                .and_then(|()| self.telemetry.flush())
            {
                info!("Telemetry client gone: {e}");
                break PollerStop::TelemetryClosed;
            }
            sent += 1;

            if self.stop.wait_timeout(self.interval) {
                break PollerStop::Requested;
            }
        };

        info!("Sensor poller stopped ({:?}) after {} sends", stop, sent);
        PollerReport { sent, stop }
    }
}

impl<W: Write + Send + 'static> SensorPoller<W> {
    /// Start the loop on a dedicated thread.
    pub fn spawn(self) -> ServerResult<PollerHandle> {
        let stop = self.stop.clone();
        let thread = thread::Builder::new()
            .name("sensor-poller".to_string())
            .spawn(move || self.run())
            .map_err(|source| ServerError::Spawn { source })?;
        Ok(PollerHandle {
            stop,
            thread: Arc::new(Mutex::new(Some(thread))),
        })
    }
}

/// Cloneable handle to a running poller thread.
#[derive(Clone)]
pub struct PollerHandle {
    stop: StopSignal,
    thread: Arc<Mutex<Option<JoinHandle<PollerReport>>>>,
}

impl PollerHandle {
    /// Ask the poller to stop without waiting.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// True once the poller thread has returned.
    pub fn is_finished(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Stop the poller and wait for its thread to end.
    ///
    /// Only the first caller joins and receives the report. The handle
    /// lock is held across the join, so a concurrent caller blocks until
    /// the thread has ended and then gets `None`.
    pub fn stop_and_join(&self) -> Option<PollerReport> {
        self.stop.request_stop();
        let mut thread = self.thread.lock();
        let handle = thread.take()?;
        match handle.join() {
            Ok(report) => {
                debug!("Sensor poller joined");
                Some(report)
            }
            Err(_) => {
                error!("Sensor poller thread panicked");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedChannel;
    use std::io;

    /// Telemetry sink that fails after `limit` bytes.
    struct LimitedSink {
        bytes: Arc<Mutex<Vec<u8>>>,
        limit: usize,
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut bytes = self.bytes.lock();
            if bytes.len() >= self.limit {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stop_signal_wakes_waiter() {
        let signal = StopSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(1)));
        let remote = signal.clone();
        let waiter = thread::spawn(move || remote.wait_timeout(Duration::from_secs(10)));
        signal.request_stop();
        assert!(waiter.join().unwrap());
        assert!(signal.is_stopped());
    }

    #[test]
    fn telemetry_disconnect_ends_loop() {
        let (channel, probe) = SimulatedChannel::new();
        probe.set_mirror(false);
        probe.set_sensors(0b0001_1000);
        let session = Arc::new(DeviceSession::new(Box::new(channel)));
        let bytes = Arc::new(Mutex::new(Vec::new()));
        let sink = LimitedSink {
            bytes: Arc::clone(&bytes),
            limit: 3,
        };

        let report = SensorPoller::new(session, sink, Duration::from_millis(1)).run();
        assert_eq!(report.stop, PollerStop::TelemetryClosed);
        assert_eq!(report.sent, 3);
        assert_eq!(*bytes.lock(), vec![0b0001_1000; 3]);
    }

    #[test]
    fn read_failure_ends_loop_without_send() {
        let (channel, probe) = SimulatedChannel::new();
        probe.fail_reads(true);
        let session = Arc::new(DeviceSession::new(Box::new(channel)));
        let bytes = Arc::new(Mutex::new(Vec::new()));
        let sink = LimitedSink {
            bytes: Arc::clone(&bytes),
            limit: usize::MAX,
        };

        let report = SensorPoller::new(session, sink, Duration::from_millis(1)).run();
        assert_eq!(report.stop, PollerStop::ChannelFailed);
        assert!(bytes.lock().is_empty());
    }

    #[test]
    fn stop_and_join_is_idempotent() {
        let (channel, _probe) = SimulatedChannel::new();
        let session = Arc::new(DeviceSession::new(Box::new(channel)));
        let sink = LimitedSink {
            bytes: Arc::new(Mutex::new(Vec::new())),
            limit: usize::MAX,
        };

        let handle = SensorPoller::new(session, sink, Duration::from_secs(60))
            .spawn()
            .unwrap();
        let report = handle.stop_and_join().expect("first join returns report");
        assert_eq!(report.stop, PollerStop::Requested);
        assert!(handle.is_finished());
        assert!(handle.stop_and_join().is_none());
    }

    /// Telemetry sink whose first write stalls, then records completion.
    struct StallingSink {
        stall: Duration,
        done: Arc<Mutex<bool>>,
    }

    impl Write for StallingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            thread::sleep(self.stall);
            *self.done.lock() = true;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn concurrent_join_waits_for_thread_end() {
        let (channel, probe) = SimulatedChannel::new();
        let session = Arc::new(DeviceSession::new(Box::new(channel)));
        let done = Arc::new(Mutex::new(false));
        let sink = StallingSink {
            stall: Duration::from_millis(300),
            done: Arc::clone(&done),
        };

        let handle = SensorPoller::new(session, sink, Duration::from_secs(3600))
            .spawn()
            .unwrap();
        while probe.read_count() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));

        let first = handle.clone();
        let joiner = thread::spawn(move || first.stop_and_join());
        thread::sleep(Duration::from_millis(50));

        // Whichever call joins, both return only after the thread ended.
        let second = handle.stop_and_join();
        assert!(*done.lock());
        let first = joiner.join().unwrap();
        assert!(first.is_some() ^ second.is_some());
        assert!(handle.is_finished());
    }
}
