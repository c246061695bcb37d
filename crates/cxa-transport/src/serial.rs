//! Direct serial transport
//!
//! The CXA's RS-232 port runs at 9600 baud, 8N1. The port is opened once
//! when the transport is created and reused for every exchange; it is
//! closed when the transport is dropped.

use std::io::{self, Read, Write};
use std::time::Duration;

use cxa_protocol::{Command, EncodeCommand, Frame, Reply};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, info, trace};

use crate::{Transport, TransportError};

/// Baud rate of the amplifier's RS-232 port
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// How long a read waits for the next byte
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Longest reply we will accumulate before giving up on a terminator
const MAX_REPLY_LEN: usize = 64;

/// Lines from earlier exchanges a query skips before giving up
const MAX_STRAY_LINES: usize = 4;

/// Byte stream to the amplifier's serial port
///
/// Implemented for the `serialport` handle; tests substitute an in-memory
/// link.
pub trait SerialLink: Read + Write + Send {
    /// Discard anything received but not yet read
    fn clear_input(&mut self) -> io::Result<()>;
}

impl SerialLink for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Serial transport holding one persistent port
pub struct SerialTransport<L = Box<dyn SerialPort>> {
    link: L,
    path: String,
}

impl SerialTransport {
    /// Open the serial port at `path` with the amplifier's settings
    pub fn open(path: &str) -> Result<Self, TransportError> {
        Self::open_with_baud(path, DEFAULT_BAUD_RATE)
    }

    /// Open the serial port at `path` with a non-default baud rate
    pub fn open_with_baud(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Open {
                port: path.to_string(),
                reason: e.to_string(),
            })?;

        info!(port = %path, baud_rate, "Opened serial port");
        Ok(Self::from_link(port, path))
    }
}

impl<L: SerialLink> SerialTransport<L> {
    /// Wrap an already-open link
    pub fn from_link(link: L, path: impl Into<String>) -> Self {
        Self {
            link,
            path: path.into(),
        }
    }

    /// The underlying link
    pub fn link(&self) -> &L {
        &self.link
    }

    fn write_command(&mut self, command: &Command) -> io::Result<()> {
        self.link.flush()?;
        self.link.write_all(&command.encode())?;
        self.link.flush()
    }
}

impl<L: SerialLink> Transport for SerialTransport<L> {
    fn describe(&self) -> &str {
        &self.path
    }

    fn try_send(&mut self, command: &Command) -> Result<(), TransportError> {
        self.write_command(command)
            .map_err(|e| TransportError::from_io(&self.path, e))?;

        // The amplifier acknowledges actions; consume the acknowledgement so
        // the next query does not read it as its own reply.
        match read_reply(&mut self.link, MAX_REPLY_LEN) {
            Ok(ack) => trace!(
                port = %self.path,
                ack = %String::from_utf8_lossy(&ack),
                "Discarded acknowledgement"
            ),
            Err(e) => debug!(port = %self.path, error = %e, "No acknowledgement"),
        }
        Ok(())
    }

    fn try_send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError> {
        if let Err(e) = self.link.clear_input() {
            debug!(port = %self.path, error = %e, "Could not clear serial input");
        }

        self.write_command(command)
            .map_err(|e| TransportError::from_io(&self.path, e))?;

        // A late acknowledgement can still land after the clear; skip lines
        // until one answers this query.
        for _ in 0..=MAX_STRAY_LINES {
            let bytes = read_reply(&mut self.link, MAX_REPLY_LEN)
                .map_err(|e| TransportError::from_io(&self.path, e))?;
            let reply =
                Reply::from_bytes(&bytes).map_err(|e| TransportError::garbage(&self.path, e))?;

            if reply.is_empty() || answers(command, &reply) {
                return Ok(reply);
            }
            debug!(
                port = %self.path,
                stray = %reply.as_str(),
                query = %command.as_str(),
                "Skipping reply to an earlier command"
            );
        }

        Err(TransportError::Timeout {
            endpoint: self.path.clone(),
        })
    }
}

/// True if `reply` answers `command`: same field, reply group one above
///
/// Commands that are not frames accept any reply.
fn answers(command: &Command, reply: &Reply) -> bool {
    match (Frame::parse(command.as_str()), Frame::parse(reply.as_str())) {
        (Ok(sent), Ok(got)) => got.group == sent.group.wrapping_add(1) && got.field == sent.field,
        (Err(_), _) => true,
        (Ok(_), Err(_)) => false,
    }
}

/// Read one reply line, terminator excluded
///
/// Stops at `\r` or `\n`, at end of stream, or after `max_len` bytes.
/// Leading terminators left over from a previous reply are skipped. A read
/// timeout after some bytes have arrived ends the reply; a timeout before
/// anything arrived is returned as an error.
pub fn read_reply<R: Read + ?Sized>(reader: &mut R, max_len: usize) -> io::Result<Vec<u8>> {
    let mut reply = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => match byte[0] {
                b'\r' | b'\n' if reply.is_empty() => continue,
                b'\r' | b'\n' => break,
                b => {
                    reply.push(b);
                    if reply.len() >= max_len {
                        break;
                    }
                }
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut && !reply.is_empty() => break,
            Err(e) => return Err(e),
        }
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxa_protocol::command;
    use std::collections::VecDeque;

    /// In-memory serial link; reads time out once the queue is empty
    #[derive(Default)]
    struct MockLink {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        /// Queued into `rx` whenever a terminator is written
        answer: Vec<u8>,
        clears: usize,
        fail_writes: bool,
    }

    impl Read for MockLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.rx.is_empty() {
                return Err(io::Error::from(io::ErrorKind::TimedOut));
            }
            let n = buf.len().min(self.rx.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.rx.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for MockLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.tx.extend_from_slice(buf);
            if buf.ends_with(b"\r") {
                self.rx.extend(self.answer.iter());
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SerialLink for MockLink {
        fn clear_input(&mut self) -> io::Result<()> {
            self.clears += 1;
            self.rx.clear();
            Ok(())
        }
    }

    /// Link where the amplifier's replies arrive late
    ///
    /// A reply is held back until the next read finds the input empty, or
    /// until the input is cleared, in which case it lands just after the
    /// clear.
    #[derive(Default)]
    struct LaggingLink {
        rx: VecDeque<u8>,
        pending: VecDeque<Vec<u8>>,
    }

    impl LaggingLink {
        fn deliver(&mut self) {
            while let Some(reply) = self.pending.pop_front() {
                self.rx.extend(reply);
            }
        }
    }

    impl Read for LaggingLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.rx.is_empty() {
                self.deliver();
            }
            let Some(byte) = self.rx.pop_front() else {
                return Err(io::Error::from(io::ErrorKind::TimedOut));
            };
            buf[0] = byte;
            Ok(1)
        }
    }

    impl Write for LaggingLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let reply: &[u8] = match buf {
                b"#01,02,1\r" => b"#02,02,1\r",
                b"#01,01\r" => b"#02,01,1\r",
                b"#03,01\r" => b"#04,01,16\r",
                b"#01,03\r" => b"#02,03,0\r",
                _ => b"#00,01\r",
            };
            self.pending.push_back(reply.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SerialLink for LaggingLink {
        fn clear_input(&mut self) -> io::Result<()> {
            self.rx.clear();
            self.deliver();
            Ok(())
        }
    }

    fn answering(answer: &[u8]) -> MockLink {
        MockLink {
            answer: answer.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_send_writes_command_and_terminator() {
        let mut t = SerialTransport::from_link(MockLink::default(), "/dev/mock");
        t.send(&command::power(true));
        assert_eq!(t.link().tx, b"#01,02,1\r");
    }

    #[test]
    fn test_sound_mode_bytes() {
        let mut t = SerialTransport::from_link(MockLink::default(), "/dev/mock");
        t.send(&cxa_protocol::encode_sound_mode("AB").unwrap());
        assert_eq!(t.link().tx, b"#1,25,1\r");
    }

    #[test]
    fn test_send_and_receive_reads_one_line() {
        let mut t = SerialTransport::from_link(answering(b"#02,01,1\r"), "/dev/mock");
        let reply = t.send_and_receive(&command::get_power()).unwrap();
        assert_eq!(reply.as_str(), "#02,01,1");
        assert_eq!(t.link().tx, b"#01,01\r");
    }

    #[test]
    fn test_stale_input_cleared_before_query() {
        let mut link = answering(b"#04,01,16\r");
        link.rx.extend(b"#02,02,1\r".iter());
        let mut t = SerialTransport::from_link(link, "/dev/mock");

        let reply = t.send_and_receive(&command::get_source()).unwrap();
        assert_eq!(reply.as_str(), "#04,01,16");
        assert_eq!(t.link().clears, 1);
    }

    #[test]
    fn test_action_acknowledgement_not_read_as_query_reply() {
        let mut t = SerialTransport::from_link(LaggingLink::default(), "/dev/mock");
        t.send(&command::power(true));

        let power = t.send_and_receive(&command::get_power()).unwrap();
        assert_eq!(power.as_str(), "#02,01,1");
        assert!(command::decode_power_state(power.as_str()));

        let source = t.send_and_receive(&command::get_source()).unwrap();
        assert_eq!(source.as_str(), "#04,01,16");
        let mute = t.send_and_receive(&command::get_mute()).unwrap();
        assert_eq!(mute.as_str(), "#02,03,0");
    }

    #[test]
    fn test_late_stray_line_skipped_by_query() {
        let mut link = LaggingLink::default();
        link.pending.push_back(b"#02,04,1\r".to_vec());
        let mut t = SerialTransport::from_link(link, "/dev/mock");

        let reply = t.send_and_receive(&command::get_power()).unwrap();
        assert_eq!(reply.as_str(), "#02,01,1");
    }

    #[test]
    fn test_only_stray_lines_is_empty_reply() {
        let acks = b"#02,02,1\r".repeat(MAX_STRAY_LINES + 2);
        let mut t = SerialTransport::from_link(answering(&acks), "/dev/mock");
        let err = t.try_send_and_receive(&command::get_power()).unwrap_err();
        assert!(err.is_transient());
        assert!(t.send_and_receive(&command::get_power()).unwrap().is_empty());
    }

    #[test]
    fn test_answers_matches_reply_group_and_field() {
        let get_power = command::get_power();
        assert!(answers(&get_power, &Reply::new("#02,01,0")));
        assert!(!answers(&get_power, &Reply::new("#02,02,1")));
        assert!(!answers(&get_power, &Reply::new("#00,01")));
        assert!(answers(&command::get_source(), &Reply::new("#04,01,16")));
        assert!(!answers(&command::get_source(), &Reply::new("#02,01,1")));
    }

    #[test]
    fn test_silent_device_is_empty_reply() {
        let mut t = SerialTransport::from_link(MockLink::default(), "/dev/mock");
        let reply = t.send_and_receive(&command::get_power()).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn test_write_failure_is_empty_reply() {
        let link = MockLink {
            fail_writes: true,
            ..Default::default()
        };
        let mut t = SerialTransport::from_link(link, "/dev/mock");
        let reply = t.send_and_receive(&command::get_mute()).unwrap();
        assert!(reply.is_empty());

        // Fire-and-forget never surfaces the failure
        t.send(&command::mute(true));
    }

    #[test]
    fn test_garbage_reply_is_surfaced() {
        let mut t = SerialTransport::from_link(answering(&[0xF0, 0x9F, b'\r']), "/dev/mock");
        let err = t.send_and_receive(&command::get_source()).unwrap_err();
        assert!(matches!(err, TransportError::ProtocolGarbage { .. }));
    }

    #[test]
    fn test_read_reply_stops_at_terminator() {
        let mut input: &[u8] = b"#04,01,16\r#02,01,1\r";
        assert_eq!(read_reply(&mut input, 64).unwrap(), b"#04,01,16");
        assert_eq!(read_reply(&mut input, 64).unwrap(), b"#02,01,1");
        assert!(read_reply(&mut input, 64).unwrap().is_empty());
    }

    #[test]
    fn test_read_reply_skips_leading_newline() {
        let mut input: &[u8] = b"\n#02,03,1\r\n";
        assert_eq!(read_reply(&mut input, 64).unwrap(), b"#02,03,1");
    }

    #[test]
    fn test_read_reply_caps_length() {
        let mut input: &[u8] = b"0123456789";
        assert_eq!(read_reply(&mut input, 4).unwrap(), b"0123");
    }

    #[test]
    fn test_read_reply_timeout() {
        let mut link = MockLink::default();
        let err = read_reply(&mut link, 64).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        // Partial data followed by a timeout is still a reply
        link.rx.extend(b"#02,01".iter());
        assert_eq!(read_reply(&mut link, 64).unwrap(), b"#02,01");
    }
}
