//! TCP relay transport
//!
//! For amplifiers whose serial port is exposed by a network relay such as
//! `ser2net` or a small forwarder on a Raspberry Pi. Nothing is held
//! between calls: every exchange connects, writes, optionally reads one
//! reply, and closes the socket when the stream goes out of scope.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use cxa_protocol::{Command, EncodeCommand, Reply};
use tracing::{debug, trace};

use crate::{Transport, TransportError};

/// Default connection timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read/write timeout once connected
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum reply size read from the relay
pub const REPLY_BUFFER_SIZE: usize = 1024;

/// Per-call TCP relay transport
#[derive(Debug, Clone)]
pub struct TcpRelayTransport {
    host: String,
    port: u16,
    endpoint: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl TcpRelayTransport {
    /// Create a transport for the relay at `host:port` with default timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            endpoint: format!("{host}:{port}"),
            host,
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Override the connect and read/write timeouts
    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
    }

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: format!("cannot resolve: {e}"),
            })?;

        let mut last_err = None;
        for addr in addrs {
            trace!(%addr, "Connecting to relay");
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.io_timeout))
                        .and_then(|_| stream.set_write_timeout(Some(self.io_timeout)))
                        .map_err(|e| TransportError::from_io(&self.endpoint, e))?;
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(endpoint = %self.endpoint, error = %e, "Failed to set TCP_NODELAY");
                    }
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(match last_err {
            Some(e) => TransportError::from_io(&self.endpoint, e),
            None => TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: "no addresses resolved".into(),
            },
        })
    }

    fn exchange(&self, command: &Command, expect_reply: bool) -> Result<Reply, TransportError> {
        let mut stream = self.connect()?;
        let io_err = |e: std::io::Error| TransportError::from_io(&self.endpoint, e);

        stream.write_all(&command.encode()).map_err(io_err)?;
        stream.flush().map_err(io_err)?;

        if !expect_reply {
            return Ok(Reply::empty());
        }

        let mut buf = [0u8; REPLY_BUFFER_SIZE];
        let mut len = 0;
        while len < buf.len() {
            let n = stream.read(&mut buf[len..]).map_err(io_err)?;
            if n == 0 {
                break;
            }
            len += n;
            if buf[..len].iter().any(|&b| b == b'\r' || b == b'\n') {
                break;
            }
        }

        Reply::from_bytes(first_line(&buf[..len]))
            .map_err(|e| TransportError::garbage(&self.endpoint, e))
    }
}

/// First non-blank line of `data`, terminators excluded
pub(crate) fn first_line(data: &[u8]) -> &[u8] {
    let is_term = |b: &u8| *b == b'\r' || *b == b'\n';
    let start = data.iter().position(|b| !is_term(b)).unwrap_or(data.len());
    let rest = &data[start..];
    let end = rest.iter().position(is_term).unwrap_or(rest.len());
    &rest[..end]
}

impl Transport for TcpRelayTransport {
    fn describe(&self) -> &str {
        &self.endpoint
    }

    fn try_send(&mut self, command: &Command) -> Result<(), TransportError> {
        self.exchange(command, false).map(|_| ())
    }

    fn try_send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError> {
        self.exchange(command, true)
    }
}
