//! Error types for CXA transports

use std::io;

use cxa_protocol::ParseError;
use thiserror::Error;

/// Errors that can occur while exchanging a command with the amplifier
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to open the serial port at construction
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    /// Could not reach the device or relay, or the link broke mid-exchange
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// Timeout waiting for the device or relay
    #[error("timeout talking to {endpoint}")]
    Timeout { endpoint: String },

    /// Something came back, but it is not protocol text
    #[error("garbage reply from {endpoint}: {source}")]
    ProtocolGarbage {
        endpoint: String,
        #[source]
        source: ParseError,
    },

    /// Command contains characters that cannot be passed to a remote shell
    #[error("refusing to relay command {0:?}")]
    UnsafeCommand(String),
}

impl TransportError {
    /// Returns true for errors a later poll may not see again
    ///
    /// These are degraded to an empty reply at the transport boundary.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. } | TransportError::Timeout { .. }
        )
    }

    /// Classify an I/O error from an exchange with `endpoint`
    pub(crate) fn from_io(endpoint: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout {
                endpoint: endpoint.to_string(),
            },
            _ => TransportError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            },
        }
    }

    pub(crate) fn garbage(endpoint: &str, source: ParseError) -> Self {
        TransportError::ProtocolGarbage {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}
