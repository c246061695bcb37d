//! Frame grammar and streaming parser
//!
//! Splits `#<group>,<field>[,<value>]` into its parts. The device facade
//! does not need this (it works on whole fragments), but the virtual
//! amplifier does, and it is handy for logging traffic.

use crate::command::Reply;
use crate::error::ParseError;

/// Maximum frame length (reasonable limit to prevent buffer overflow)
const MAX_FRAME_LEN: usize = 32;

/// Well-known protocol groups
pub mod group {
    /// Error replies (`#00,01` unknown group, `#00,02` unknown number, `#00,03` bad data)
    pub const ERROR: u8 = 0;
    /// Amplifier commands (power, mute, sound mode)
    pub const AMP_COMMAND: u8 = 1;
    /// Amplifier replies
    pub const AMP_REPLY: u8 = 2;
    /// Source commands
    pub const SOURCE_COMMAND: u8 = 3;
    /// Source replies
    pub const SOURCE_REPLY: u8 = 4;
}

/// A parsed protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command/reply group
    pub group: u8,
    /// Field number within the group
    pub field: u8,
    /// Optional value, kept verbatim (`"16"`, `"1"`)
    pub value: Option<String>,
}

impl Frame {
    /// Parse a frame (terminator already stripped)
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let body = text
            .strip_prefix('#')
            .ok_or_else(|| ParseError::MissingPrefix(text.into()))?;

        let mut parts = body.split(',');
        let group = parse_number(parts.next(), text)?;
        let field = parse_number(parts.next(), text)?;
        let value = parts.next().map(str::to_string);

        if parts.next().is_some() {
            return Err(ParseError::InvalidFrame(format!("too many fields: {text}")));
        }
        if value.as_deref() == Some("") {
            return Err(ParseError::InvalidFrame(format!("empty value: {text}")));
        }

        Ok(Self {
            group,
            field,
            value,
        })
    }

    /// Value parsed as a number, if present and numeric
    pub fn numeric_value(&self) -> Option<u8> {
        self.value.as_deref().and_then(|v| v.parse().ok())
    }
}

fn parse_number(part: Option<&str>, frame: &str) -> Result<u8, ParseError> {
    let part = part.ok_or_else(|| ParseError::InvalidFrame(format!("missing field: {frame}")))?;
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidNumber(frame.into()));
    }
    part.parse()
        .map_err(|_| ParseError::InvalidNumber(frame.into()))
}

/// Streaming frame parser
///
/// Accepts arbitrary chunks of bytes and yields one frame per `\r` or `\n`
/// terminated line. Blank lines (the `\n` of a `\r\n` pair) are skipped.
#[derive(Debug)]
pub struct FrameCodec {
    buffer: Vec<u8>,
}

impl FrameCodec {
    /// Create a new frame codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Prevent buffer overflow
        if self.buffer.len() > MAX_FRAME_LEN * 4 {
            // Keep only the last portion
            let start = self.buffer.len() - MAX_FRAME_LEN;
            self.buffer = self.buffer[start..].to_vec();
        }
    }

    /// Try to extract the next complete frame from the buffer
    pub fn next_frame(&mut self) -> Option<Result<Frame, ParseError>> {
        self.next_frame_with_bytes().map(|(frame, _)| frame)
    }

    /// Try to extract the next complete frame along with its raw bytes
    pub fn next_frame_with_bytes(&mut self) -> Option<(Result<Frame, ParseError>, Vec<u8>)> {
        loop {
            let term_pos = self.buffer.iter().position(|&b| b == b'\r' || b == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=term_pos).collect();
            let body = &line[..line.len() - 1];
            if body.is_empty() {
                continue;
            }

            let frame = match Reply::from_bytes(body) {
                Ok(reply) => Frame::parse(reply.as_str()),
                Err(e) => Err(e),
            };
            if let Err(e) = &frame {
                tracing::warn!("Failed to parse CXA frame: {}", e);
            }
            return Some((frame, line));
        }
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let frame = Frame::parse("#01,01").unwrap();
        assert_eq!(frame.group, group::AMP_COMMAND);
        assert_eq!(frame.field, 1);
        assert_eq!(frame.value, None);
    }

    #[test]
    fn test_parse_with_value() {
        let frame = Frame::parse("#04,01,16\r").unwrap();
        assert_eq!(frame.group, group::SOURCE_REPLY);
        assert_eq!(frame.field, 1);
        assert_eq!(frame.value.as_deref(), Some("16"));
        assert_eq!(frame.numeric_value(), Some(16));
    }

    #[test]
    fn test_parse_unpadded_group() {
        // Sound mode commands use a single-digit group
        let frame = Frame::parse("#1,25,1").unwrap();
        assert_eq!(frame.group, 1);
        assert_eq!(frame.field, 25);
        assert_eq!(frame.numeric_value(), Some(1));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Frame::parse(""), Err(ParseError::Empty));
        assert!(matches!(
            Frame::parse("01,01"),
            Err(ParseError::MissingPrefix(_))
        ));
        assert!(matches!(Frame::parse("#01"), Err(ParseError::InvalidFrame(_))));
        assert!(matches!(
            Frame::parse("#0a,01"),
            Err(ParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            Frame::parse("#01,02,1,9"),
            Err(ParseError::InvalidFrame(_))
        ));
        assert!(matches!(
            Frame::parse("#01,02,"),
            Err(ParseError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_streaming_parse() {
        let mut codec = FrameCodec::new();

        codec.push_bytes(b"#01,0");
        assert!(codec.next_frame().is_none());

        codec.push_bytes(b"2,1\r");
        let frame = codec.next_frame().unwrap().unwrap();
        assert_eq!(frame.group, 1);
        assert_eq!(frame.field, 2);
        assert_eq!(frame.value.as_deref(), Some("1"));
    }

    #[test]
    fn test_multiple_frames_and_crlf() {
        let mut codec = FrameCodec::new();
        codec.push_bytes(b"#01,01\r\n#03,01\r#01,03\n");

        let (frame, raw) = codec.next_frame_with_bytes().unwrap();
        assert_eq!(frame.unwrap().group, 1);
        assert_eq!(raw, b"#01,01\r");
        assert_eq!(codec.next_frame().unwrap().unwrap().group, 3);
        assert_eq!(codec.next_frame().unwrap().unwrap().field, 3);
        assert!(codec.next_frame().is_none());
    }

    #[test]
    fn test_garbage_yields_error_not_panic() {
        let mut codec = FrameCodec::new();
        codec.push_bytes(&[0xFF, 0x00, b'\r', b'#', b'0', b'1', b',', b'0', b'1', b'\r']);

        assert!(codec.next_frame().unwrap().is_err());
        assert!(codec.next_frame().unwrap().is_ok());
    }

    #[test]
    fn test_clear() {
        let mut codec = FrameCodec::new();
        codec.push_bytes(b"#01,0");
        codec.clear();
        codec.push_bytes(b"1\r");
        assert!(codec.next_frame().unwrap().is_err());
    }
}
