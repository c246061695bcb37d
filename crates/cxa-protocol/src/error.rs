//! Error types for CXA protocol encoding and decoding

use thiserror::Error;

use crate::Profile;

/// Errors that can occur while parsing raw protocol text
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing to parse
    #[error("empty frame")]
    Empty,

    /// Frame does not start with `#`
    #[error("missing '#' prefix: {0}")]
    MissingPrefix(String),

    /// Invalid frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Group or field is not a decimal number
    #[error("invalid number in frame: {0}")]
    InvalidNumber(String),

    /// Bytes are not printable ASCII
    #[error("reply is not ASCII text ({len} bytes)")]
    NotText { len: usize },
}

/// Errors from the label/fragment lookup tables
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Source label is not in the profile's select table
    #[error("unknown source {label:?} for {profile}")]
    UnknownSource { profile: Profile, label: String },

    /// Sound mode label is not in the sound mode table
    #[error("unknown sound mode {0:?}")]
    UnknownSoundMode(String),

    /// Reply does not exactly match any entry of the profile's reply table
    #[error("unrecognized source reply {reply:?} for {profile}")]
    UnrecognizedReply { profile: Profile, reply: String },

    /// Model name is not a known profile
    #[error("unknown amplifier model {0:?} (expected CXA61 or CXA81)")]
    UnknownProfile(String),
}
