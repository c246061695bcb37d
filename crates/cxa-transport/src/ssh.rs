//! SSH relay transport
//!
//! For amplifiers wired to a USB serial adapter on another machine. Each
//! exchange runs one `ssh` process that opens the remote tty, writes the
//! command, reads a single line back and prints it. Key-based login is
//! assumed (`BatchMode=yes`); there is no password prompt to answer.
//!
//! This is best-effort. Anything that goes wrong on the way (ssh missing,
//! host unreachable, remote shell error) is a connection failure and reads
//! as an empty reply.

use std::io::Read;
use std::process::{Child, Command as Process, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use cxa_protocol::{Command, Reply};
use tracing::{debug, trace};

use crate::tcp::first_line;
use crate::{Transport, TransportError};

/// Serial device on the relay host
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";

/// How long a whole exchange may take before the ssh process is killed
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One-process-per-call SSH relay transport
#[derive(Debug, Clone)]
pub struct SshRelayTransport {
    host: String,
    username: String,
    tty: String,
    program: String,
    endpoint: String,
    timeout: Duration,
}

impl SshRelayTransport {
    /// Relay through `username@host`, using the default tty
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        let host = host.into();
        let username = username.into();
        Self {
            endpoint: format!("{username}@{host}"),
            host,
            username,
            tty: DEFAULT_TTY.to_string(),
            program: "ssh".to_string(),
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }

    /// Use a different serial device on the relay host
    pub fn with_tty(mut self, tty: impl Into<String>) -> Self {
        self.tty = tty.into();
        self
    }

    /// Run `program` instead of `ssh`; it receives the same arguments
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Kill the ssh process if an exchange takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shell script run on the relay host for `command`
    ///
    /// `icrnl` turns the amplifier's `\r` into a newline so `read` returns
    /// at the end of the reply.
    pub fn remote_script(&self, command: &Command) -> Result<String, TransportError> {
        if !is_safe_command(command.as_str()) {
            return Err(TransportError::UnsafeCommand(command.as_str().to_string()));
        }
        if !is_safe_path(&self.tty) {
            return Err(TransportError::UnsafeCommand(self.tty.clone()));
        }

        Ok(format!(
            "tty={tty}; exec 4<$tty 5>$tty; stty -F $tty 9600 -echo icrnl; \
             printf '%s\\r' '{cmd}' >&5; read reply <&4; echo \"$reply\"",
            tty = self.tty,
            cmd = command.as_str(),
        ))
    }

    fn spawn(&self, script: &str) -> Result<Child, TransportError> {
        trace!(endpoint = %self.endpoint, %script, "Spawning ssh");
        Process::new(&self.program)
            .args(["-o", "BatchMode=yes", "-o", "ConnectTimeout=5", "--"])
            .arg(format!("{}@{}", self.username, self.host))
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: format!("cannot run {}: {e}", self.program),
            })
    }

    fn run(&self, command: &Command) -> Result<Vec<u8>, TransportError> {
        let script = self.remote_script(command)?;
        let mut child = self.spawn(&script)?;

        // Drain stdout while waiting so a full pipe cannot stall the child
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut output = Vec::new();
                stdout.read_to_end(&mut output).map(|_| output)
            })
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    if let Err(e) = child.kill() {
                        debug!(endpoint = %self.endpoint, error = %e, "Failed to kill ssh");
                    }
                    let _ = child.wait();
                    return Err(TransportError::Timeout {
                        endpoint: self.endpoint.clone(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(TransportError::from_io(&self.endpoint, e)),
            }
        };

        if !status.success() {
            return Err(TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: format!("{} exited with {status}", self.program),
            });
        }

        match reader.map(|handle| handle.join()) {
            Some(Ok(output)) => output.map_err(|e| TransportError::from_io(&self.endpoint, e)),
            Some(Err(_)) => Err(TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: "stdout reader panicked".into(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

fn is_safe_command(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'#' || b == b',')
}

/// True if `text` is an absolute path the remote shell can take verbatim
pub fn is_safe_path(text: &str) -> bool {
    text.starts_with('/')
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'_' | b'-' | b'.'))
}

/// True if `text` can be a host or user name without being read as an
/// ssh option
pub fn is_safe_destination(text: &str) -> bool {
    !text.is_empty()
        && !text.starts_with('-')
        && !text.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
}

impl Transport for SshRelayTransport {
    fn describe(&self) -> &str {
        &self.endpoint
    }

    fn try_send(&mut self, command: &Command) -> Result<(), TransportError> {
        self.run(command).map(|_| ())
    }

    fn try_send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError> {
        let output = self.run(command)?;
        Reply::from_bytes(first_line(&output))
            .map_err(|e| TransportError::garbage(&self.endpoint, e))
    }
}
