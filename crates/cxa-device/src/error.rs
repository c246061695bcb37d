//! Error types for the device facade

use cxa_protocol::CodecError;
use cxa_transport::TransportError;
use thiserror::Error;

/// Problems with a device configuration; fatal at construction
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field is missing or empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but unusable
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The configuration file is not valid JSON for a device
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from the companion streamer's HTTP surface
#[derive(Debug, Error)]
pub enum CompanionError {
    /// Request could not be built, sent or read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The companion answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Errors returned by device operations
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unknown source or sound mode label
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Transport could not be constructed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A companion request failed part-way through a volume step
    #[error("companion error: {0}")]
    Companion(#[from] CompanionError),

    /// Volume stepping needs a companion streamer
    #[error("no companion streamer configured")]
    NoCompanion,
}
