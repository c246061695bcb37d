//! Virtual amplifier for testing
//!
//! Speaks the CXA serial protocol from the amplifier's side: parses
//! incoming frames, tracks power/mute/source/sound mode, and queues the
//! reply the real unit would send for each command.

use std::collections::VecDeque;

use cxa_protocol::frame::group;
use cxa_protocol::{decode_source_reply, encode_select_source, CodecError, Frame, FrameCodec, Profile};
use tracing::{debug, warn};

/// Amp command fields
mod field {
    pub const POWER_QUERY: u8 = 1;
    pub const POWER_SET: u8 = 2;
    pub const MUTE_QUERY: u8 = 3;
    pub const MUTE_SET: u8 = 4;
    pub const SOUND_MODE_SET: u8 = 25;
    /// Source command fields
    pub const SOURCE_QUERY: u8 = 1;
    pub const SOURCE_SET: u8 = 4;
}

/// Error replies
const ERR_UNKNOWN_GROUP: &str = "#00,01";
const ERR_UNKNOWN_NUMBER: &str = "#00,02";
const ERR_BAD_DATA: &str = "#00,03";

/// Virtual CXA amplifier
///
/// Starts in standby, unmuted, on input A1 with speaker output A.
#[derive(Debug)]
pub struct VirtualAmplifier {
    /// Identifier for logging
    id: String,
    profile: Profile,
    power: bool,
    muted: bool,
    /// Source index as sent on the wire (`"16"`)
    source: String,
    sound_mode: u8,
    codec: FrameCodec,
    /// Replies waiting to be read, terminator included
    output: VecDeque<Vec<u8>>,
    /// Raw command lines received (for test verification)
    received_commands: Vec<Vec<u8>>,
}

impl VirtualAmplifier {
    /// Create a new virtual amplifier
    pub fn new(id: impl Into<String>, profile: Profile) -> Self {
        Self {
            id: id.into(),
            profile,
            power: false,
            muted: false,
            source: "00".to_string(),
            sound_mode: 0,
            codec: FrameCodec::new(),
            output: VecDeque::new(),
            received_commands: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn power(&self) -> bool {
        self.power
    }

    pub fn set_power(&mut self, on: bool) {
        self.power = on;
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Current source label
    pub fn source(&self) -> Option<&'static str> {
        decode_source_reply(self.profile, &self.source_reply()).ok()
    }

    /// Switch input by label, as if from the front panel
    pub fn set_source(&mut self, label: &str) -> Result<(), CodecError> {
        let command = encode_select_source(self.profile, label)?;
        if let Some(index) = command.as_str().rsplit(',').next() {
            self.source = index.to_string();
        }
        Ok(())
    }

    /// Speaker output: 0 = A, 1 = A+B, 2 = B
    pub fn sound_mode(&self) -> u8 {
        self.sound_mode
    }

    fn source_reply(&self) -> String {
        format!("#04,01,{}", self.source)
    }

    /// Feed raw bytes from the controller
    ///
    /// Every complete line is handled and its reply queued. Returns true if
    /// any command changed state.
    pub fn process_bytes(&mut self, data: &[u8]) -> bool {
        self.codec.push_bytes(data);

        let mut changed = false;
        while let Some((frame, raw)) = self.codec.next_frame_with_bytes() {
            self.received_commands.push(raw);
            let reply = match frame {
                Ok(frame) => self.handle_frame(&frame, &mut changed),
                // The real unit ignores lines it cannot parse
                Err(_) => continue,
            };
            debug!(id = %self.id, %reply, "Virtual amp reply");
            let mut bytes = reply.into_bytes();
            bytes.push(cxa_protocol::TERMINATOR);
            self.output.push_back(bytes);
        }
        changed
    }

    fn handle_frame(&mut self, frame: &Frame, changed: &mut bool) -> String {
        match (frame.group, frame.field) {
            (group::AMP_COMMAND, field::POWER_QUERY) => format!("#02,01,{}", self.power as u8),
            (group::AMP_COMMAND, field::MUTE_QUERY) => format!("#02,03,{}", self.muted as u8),
            (group::AMP_COMMAND, field::POWER_SET) => match frame.numeric_value() {
                Some(v @ 0..=1) => {
                    *changed |= self.power != (v == 1);
                    self.power = v == 1;
                    format!("#02,02,{v}")
                }
                _ => ERR_BAD_DATA.to_string(),
            },
            (group::AMP_COMMAND, field::MUTE_SET) => match frame.numeric_value() {
                Some(v @ 0..=1) => {
                    *changed |= self.muted != (v == 1);
                    self.muted = v == 1;
                    format!("#02,04,{v}")
                }
                _ => ERR_BAD_DATA.to_string(),
            },
            (group::AMP_COMMAND, field::SOUND_MODE_SET) => match frame.numeric_value() {
                Some(v @ 0..=2) => {
                    *changed |= self.sound_mode != v;
                    self.sound_mode = v;
                    format!("#02,25,{v}")
                }
                _ => ERR_BAD_DATA.to_string(),
            },
            (group::SOURCE_COMMAND, field::SOURCE_QUERY) => self.source_reply(),
            (group::SOURCE_COMMAND, field::SOURCE_SET) => {
                let Some(value) = frame.value.as_deref() else {
                    return ERR_BAD_DATA.to_string();
                };
                let fragment = format!("#03,04,{value}");
                let known = self
                    .profile
                    .select_table()
                    .iter()
                    .any(|(_, select)| *select == fragment);
                if !known {
                    warn!(id = %self.id, %fragment, "Virtual amp has no such input");
                    return ERR_BAD_DATA.to_string();
                }
                *changed |= self.source != value;
                self.source = value.to_string();
                format!("#04,04,{value}")
            }
            (group::AMP_COMMAND, _) | (group::SOURCE_COMMAND, _) => ERR_UNKNOWN_NUMBER.to_string(),
            _ => ERR_UNKNOWN_GROUP.to_string(),
        }
    }

    /// Take the next queued reply
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.output.pop_front()
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Drop queued replies and any partial input
    pub fn clear_output(&mut self) {
        self.output.clear();
        self.codec.clear();
    }

    /// Get all received commands (for test verification)
    pub fn received_commands(&self) -> &[Vec<u8>] {
        &self.received_commands
    }

    /// Clear received commands
    pub fn clear_received(&mut self) {
        self.received_commands.clear();
    }
}
