//! Commands, replies and the fixed command set
//!
//! Power and mute are pure constants; only source and sound mode selection
//! need a table lookup (see [`crate::codec`]).

use std::fmt;

use crate::error::ParseError;
use crate::{EncodeCommand, TERMINATOR};

/// Query the power state: `#01,01`
pub const GET_POWER: &str = "#01,01";
/// Query the current source: `#03,01`
pub const GET_SOURCE: &str = "#03,01";
/// Query the mute state: `#01,03`
pub const GET_MUTE: &str = "#01,03";

/// Power on: `#01,02,1`
pub const SET_POWER_ON: &str = "#01,02,1";
/// Power off (standby): `#01,02,0`
pub const SET_POWER_OFF: &str = "#01,02,0";
/// Mute on: `#01,04,1`
pub const SET_MUTE_ON: &str = "#01,04,1";
/// Mute off: `#01,04,0`
pub const SET_MUTE_OFF: &str = "#01,04,0";

/// Reply fragment reported while the amplifier is on
pub const REPLY_POWER_ON: &str = "#02,01,1";
/// Reply fragment reported while the amplifier is in standby
pub const REPLY_POWER_STANDBY: &str = "#02,01,0";
/// Reply fragment reported while muted
pub const REPLY_MUTE_ON: &str = "#02,03,1";
/// Reply fragment reported while not muted
pub const REPLY_MUTE_OFF: &str = "#02,03,0";

/// A command string without its terminator, e.g. `#03,04,16`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Wrap a command string
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The command text without terminator
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the amplifier answers this command with a state report
    ///
    /// Queries carry only a group and a field (`#01,01`); actions carry a
    /// value as well (`#01,02,1`).
    pub fn is_query(&self) -> bool {
        self.0.matches(',').count() == 1
    }
}

impl EncodeCommand for Command {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.push(TERMINATOR);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reply read back from the amplifier, trailing terminators stripped
///
/// An empty reply means nothing usable came back (the transport timed out
/// or could not connect).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply(String);

impl Reply {
    /// Create a reply from raw text, stripping trailing `\r`/`\n`
    pub fn new(raw: impl Into<String>) -> Self {
        let mut text = raw.into();
        let trimmed_len = text.trim_end_matches(['\r', '\n']).len();
        text.truncate(trimmed_len);
        Self(text)
    }

    /// The empty reply
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Create a reply from raw bytes read off a transport
    ///
    /// Fails if the bytes are not ASCII; the amplifier never sends anything
    /// else, so anything else is line noise.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        if !data.is_ascii() {
            return Err(ParseError::NotText { len: data.len() });
        }
        Ok(Self::new(String::from_utf8_lossy(data).into_owned()))
    }

    /// Returns true if nothing came back
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The reply text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Reply {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Power state query
pub fn get_power() -> Command {
    Command::new(GET_POWER)
}

/// Current source query
pub fn get_source() -> Command {
    Command::new(GET_SOURCE)
}

/// Mute state query
pub fn get_mute() -> Command {
    Command::new(GET_MUTE)
}

/// Power on/off action
pub fn power(on: bool) -> Command {
    Command::new(if on { SET_POWER_ON } else { SET_POWER_OFF })
}

/// Mute on/off action
pub fn mute(on: bool) -> Command {
    Command::new(if on { SET_MUTE_ON } else { SET_MUTE_OFF })
}

/// True iff the power-on fragment appears anywhere in the reply
///
/// Containment rather than equality: the amplifier may pad or prefix its
/// replies. Anything else, including an empty reply, reads as off.
pub fn decode_power_state(reply: &str) -> bool {
    reply.contains(REPLY_POWER_ON)
}

/// True iff the mute-on fragment appears anywhere in the reply
pub fn decode_mute_state(reply: &str) -> bool {
    reply.contains(REPLY_MUTE_ON)
}
