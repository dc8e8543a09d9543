//! Network links: listener setup, client accept, command framing.

use petra_common::consts::COMMAND_FRAME_LEN;
use petra_common::protocol::decode_frame;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ConnectionError;

/// Name of the command connection in logs and errors.
pub const CONTROL: &str = "control";

/// Name of the sensor stream connection in logs and errors.
pub const TELEMETRY: &str = "telemetry";

/// Bind a listener. `host` may be an address or a resolvable name.
pub fn bind(host: &str, port: u16) -> Result<TcpListener, ConnectionError> {
    let listener = TcpListener::bind((host, port)).map_err(|source| ConnectionError::Bind {
        addr: format!("{host}:{port}"),
        source,
    })?;
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on {addr}");
    }
    Ok(listener)
}

/// Block until one client connects.
pub fn accept(listener: &TcpListener, link: &'static str) -> Result<TcpStream, ConnectionError> {
    info!("Waiting for {link} client");
    let (stream, peer) = listener
        .accept()
        .map_err(|source| ConnectionError::Accept { link, source })?;
    stream
        .set_nodelay(true)
        .map_err(|source| ConnectionError::Setup { link, source })?;
    info!("{link} client connected from {peer}");
    Ok(stream)
}

/// Apply the telemetry write timeout.
pub fn set_send_timeout(
    stream: &TcpStream,
    timeout: Option<Duration>,
) -> Result<(), ConnectionError> {
    stream
        .set_write_timeout(timeout)
        .map_err(|source| ConnectionError::Setup {
            link: TELEMETRY,
            source,
        })
}

/// Read one command frame and return its raw tag.
pub fn receive_tag<R: Read>(link: &mut R) -> Result<i32, ConnectionError> {
    let mut frame = [0u8; COMMAND_FRAME_LEN];
    link.read_exact(&mut frame).map_err(|source| {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            ConnectionError::Closed { link: CONTROL }
        } else {
            ConnectionError::Receive {
                link: CONTROL,
                source,
            }
        }
    })?;
    Ok(decode_frame(frame))
}

/// Send the one-byte acknowledgement.
pub fn send_ack<W: Write>(link: &mut W, byte: u8) -> Result<(), ConnectionError> {
    link.write_all(&[byte])
        .and_then(|()| link.flush())
        .map_err(|source| ConnectionError::Send {
            link: CONTROL,
            source,
        })
}

/// Close a stream in both directions, ignoring already-closed sockets.
pub fn close(stream: &TcpStream) {
    if let Err(e) = stream.shutdown(std::net::Shutdown::Both) {
        if e.kind() != io::ErrorKind::NotConnected {
            warn!("Socket shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn receive_tag_decodes_frames() {
        let mut input = Cursor::new(vec![1, 0, 0, 0, 13, 0, 0, 0]);
        assert_eq!(receive_tag(&mut input).unwrap(), 1);
        assert_eq!(receive_tag(&mut input).unwrap(), 13);
        assert!(matches!(
            receive_tag(&mut input),
            Err(ConnectionError::Closed { .. })
        ));
    }

    #[test]
    fn partial_frame_is_disconnect() {
        let mut input = Cursor::new(vec![1, 0]);
        assert!(matches!(
            receive_tag(&mut input),
            Err(ConnectionError::Closed { link: CONTROL })
        ));
    }

    #[test]
    fn send_ack_writes_one_byte() {
        let mut out = Vec::new();
        send_ack(&mut out, 0x60).unwrap();
        assert_eq!(out, vec![0x60]);
    }

    #[test]
    fn bind_ephemeral_and_accept() {
        let listener = bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || TcpStream::connect(addr).unwrap());
        let server_side = accept(&listener, CONTROL).unwrap();
        let _client = client.join().unwrap();
        close(&server_side);
    }
}
