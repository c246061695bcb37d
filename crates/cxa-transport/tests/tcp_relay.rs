//! TCP relay transport against a loopback relay
//!
//! Each test binds a listener on 127.0.0.1 and answers from a thread,
//! standing in for `ser2net` in front of the amplifier.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use cxa_protocol::{command, encode_sound_mode, Profile};
use cxa_transport::{TcpRelayTransport, Transport, TransportError};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Start a relay that accepts `connections` clients, records what each
    /// sent, and answers with `reply` (if any)
    pub fn relay(
        connections: usize,
        reply: Option<&'static [u8]>,
    ) -> (u16, thread::JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            for _ in 0..connections {
                let (mut stream, _) = listener.accept().unwrap();
                stream
                    .set_read_timeout(Some(Duration::from_secs(2)))
                    .unwrap();

                let mut data = Vec::new();
                let mut byte = [0u8; 1];
                while stream.read(&mut byte).unwrap_or(0) == 1 {
                    data.push(byte[0]);
                    if byte[0] == b'\r' {
                        break;
                    }
                }
                if let Some(reply) = reply {
                    stream.write_all(reply).unwrap();
                }
                received.push(data);
            }
            received
        });

        (port, handle)
    }

    /// A port nothing is listening on
    pub fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    pub fn transport(port: u16) -> TcpRelayTransport {
        TcpRelayTransport::new("127.0.0.1", port)
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(1))
    }
}

use helpers::*;

// ============================================================================
// Exchanges
// ============================================================================

#[test]
fn test_query_reads_reply() {
    let (port, relay) = relay(1, Some(b"#02,01,1\r"));
    let mut t = transport(port);

    let reply = t.send_and_receive(&command::get_power()).unwrap();
    assert_eq!(reply.as_str(), "#02,01,1");
    assert!(cxa_protocol::decode_power_state(reply.as_str()));

    assert_eq!(relay.join().unwrap(), vec![b"#01,01\r".to_vec()]);
}

#[test]
fn test_each_call_opens_a_new_connection() {
    let (port, relay) = relay(2, Some(b"#04,01,20\r"));
    let mut t = transport(port);

    let reply = t.send_and_receive(&command::get_source()).unwrap();
    assert_eq!(
        cxa_protocol::decode_source_reply(Profile::Cxa81, reply.as_str()).unwrap(),
        "XLR"
    );
    t.send(&command::mute(true));

    let received = relay.join().unwrap();
    assert_eq!(received[0], b"#03,01\r");
    assert_eq!(received[1], b"#01,04,1\r");
}

#[test]
fn test_sound_mode_bytes_on_the_wire() {
    let (port, relay) = relay(1, None);
    let mut t = transport(port);

    t.send(&encode_sound_mode("AB").unwrap());
    assert_eq!(relay.join().unwrap(), vec![b"#1,25,1\r".to_vec()]);
}

#[test]
fn test_silent_relay_times_out_to_empty_reply() {
    let (port, relay) = relay(1, None);
    let mut t = transport(port);

    let err = t.try_send_and_receive(&command::get_mute());
    // The relay closes without answering; either EOF or a timeout
    match err {
        Ok(reply) => assert!(reply.is_empty()),
        Err(e) => assert!(e.is_transient()),
    }
    relay.join().unwrap();
}

// ============================================================================
// Connection failures
// ============================================================================

#[test]
fn test_refused_connection_is_empty_reply() {
    let mut t = transport(closed_port());

    let err = t.try_send_and_receive(&command::get_power()).unwrap_err();
    assert!(matches!(
        err,
        TransportError::ConnectionFailed { .. } | TransportError::Timeout { .. }
    ));

    let reply = t.send_and_receive(&command::get_power()).unwrap();
    assert!(reply.is_empty());
}

#[test]
fn test_send_to_refused_connection_does_not_panic() {
    let mut t = transport(closed_port());
    t.send(&command::power(false));
}

#[test]
fn test_garbage_reply_is_surfaced() {
    let (port, relay) = relay(1, Some(&[0xC3, 0xA9, b'\r']));
    let mut t = transport(port);

    let err = t.send_and_receive(&command::get_source()).unwrap_err();
    assert!(matches!(err, TransportError::ProtocolGarbage { .. }));
    relay.join().unwrap();
}
