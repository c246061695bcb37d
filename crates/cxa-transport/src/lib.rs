//! Transports for CXA amplifier control
//!
//! The [`Transport`] trait abstracts over how a command string reaches the
//! amplifier's RS-232 port:
//!
//! - [`SerialTransport`]: a directly attached serial port, opened once and
//!   held for the transport's lifetime
//! - [`TcpRelayTransport`]: a TCP relay (e.g. `ser2net`) next to the
//!   amplifier, one connection per exchange
//! - [`SshRelayTransport`]: a remote host with the serial adapter attached,
//!   driven through `ssh` one process per exchange (best-effort)
//!
//! # Error policy
//!
//! Implementations report every failure from [`Transport::try_send`] and
//! [`Transport::try_send_and_receive`]. The provided [`Transport::send`] and
//! [`Transport::send_and_receive`] are what the device facade uses: a lost
//! connection or a timeout is logged and becomes an empty reply, so a single
//! missed poll never reaches the caller. Only undecodable replies
//! ([`TransportError::ProtocolGarbage`]) and refused commands are surfaced.
//!
//! # Concurrency
//!
//! All calls block. Transports are `Send` but take `&mut self`; callers
//! that share one across threads must serialise access themselves.

pub mod error;
pub mod serial;
pub mod ssh;
pub mod tcp;

pub use error::TransportError;
pub use serial::{SerialLink, SerialTransport};
pub use ssh::SshRelayTransport;
pub use tcp::TcpRelayTransport;

use cxa_protocol::{Command, Reply};
use tracing::{debug, error, warn};

/// Blocking command transport to one amplifier
pub trait Transport: Send {
    /// Human-readable endpoint for logs (`/dev/ttyUSB0`, `pi@relay`, ...)
    fn describe(&self) -> &str;

    /// Send a command without waiting for a reply
    fn try_send(&mut self, command: &Command) -> Result<(), TransportError>;

    /// Send a command and read one reply line
    fn try_send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError>;

    /// Fire-and-forget send; failures are logged, never returned
    fn send(&mut self, command: &Command) {
        debug!(transport = self.describe(), %command, "Sending command");
        if let Err(e) = self.try_send(command) {
            error!(
                transport = self.describe(),
                %command,
                error = %e,
                "Could not send command"
            );
        }
    }

    /// Send a query and return its reply
    ///
    /// Connection failures and timeouts are logged and produce an empty
    /// reply. Garbage replies are returned as errors.
    fn send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError> {
        match self.try_send_and_receive(command) {
            Ok(reply) => {
                debug!(transport = self.describe(), %command, %reply, "Received reply");
                Ok(reply)
            }
            Err(e) if e.is_transient() => {
                warn!(
                    transport = self.describe(),
                    %command,
                    error = %e,
                    "No reply, treating as empty"
                );
                Ok(Reply::empty())
            }
            Err(e) => Err(e),
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn describe(&self) -> &str {
        (**self).describe()
    }

    fn try_send(&mut self, command: &Command) -> Result<(), TransportError> {
        (**self).try_send(command)
    }

    fn try_send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError> {
        (**self).try_send_and_receive(command)
    }

    fn send(&mut self, command: &Command) {
        (**self).send(command)
    }

    fn send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError> {
        (**self).send_and_receive(command)
    }
}
