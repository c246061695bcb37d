//! CXA Protocol Library
//!
//! This crate provides command encoding and reply decoding for the
//! RS-232 control protocol of Cambridge Audio CXA61/CXA81 amplifiers.
//!
//! # Format
//!
//! Every message is ASCII of the form `#<group>,<field>[,<value>]`:
//! - Commands sent to the amplifier end with a carriage return (`\r`)
//! - Replies use the same grammar; the terminator is stripped on receive
//!
//! Groups come in command/reply pairs. Amplifier commands use group `01`
//! and are answered in group `02`; source commands use group `03` and are
//! answered in group `04`. Because of this, the fragment that *selects* a
//! source (`#03,04,16`) is never the fragment that *reports* it
//! (`#04,01,16`), and each profile carries two separate source tables.
//!
//! # Example
//!
//! ```rust
//! use cxa_protocol::{decode_source_reply, encode_select_source, EncodeCommand, Profile};
//!
//! let cmd = encode_select_source(Profile::Cxa61, "USB").unwrap();
//! assert_eq!(cmd.encode(), b"#03,04,16\r");
//!
//! let label = decode_source_reply(Profile::Cxa61, "#04,01,16\r").unwrap();
//! assert_eq!(label, "USB");
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod frame;
pub mod models;

pub use codec::{
    decode_source_reply, encode_select_source, encode_sound_mode, sound_mode_list, source_list,
};
pub use command::{decode_mute_state, decode_power_state, Command, Reply};
pub use error::{CodecError, ParseError};
pub use frame::{Frame, FrameCodec};
pub use models::Profile;

/// Byte appended to every command on the wire
pub const TERMINATOR: u8 = b'\r';

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format, terminator included
    fn encode(&self) -> Vec<u8>;
}
