//! In-memory transport backed by a [`VirtualAmplifier`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cxa_protocol::{Command, EncodeCommand, Reply};
use cxa_transport::{Transport, TransportError};

use crate::amplifier::VirtualAmplifier;

/// Transport that talks to a virtual amplifier instead of a port
///
/// The amplifier is shared, so a test can keep a handle to inspect or
/// change it after the transport has been boxed into a device. Setting the
/// transport offline makes every exchange fail as a lost connection.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    endpoint: String,
    amplifier: Arc<Mutex<VirtualAmplifier>>,
    offline: Arc<AtomicBool>,
}

impl SimulatedTransport {
    pub fn new(amplifier: VirtualAmplifier) -> Self {
        Self {
            endpoint: format!("[SIM] {}", amplifier.id()),
            amplifier: Arc::new(Mutex::new(amplifier)),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle to the amplifier
    pub fn amplifier(&self) -> Arc<Mutex<VirtualAmplifier>> {
        Arc::clone(&self.amplifier)
    }

    /// Make the amplifier unreachable (or reachable again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn connect(&self) -> Result<MutexGuard<'_, VirtualAmplifier>, TransportError> {
        if self.is_offline() {
            return Err(TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: "simulated amplifier is offline".into(),
            });
        }
        self.amplifier
            .lock()
            .map_err(|_| TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: "simulated amplifier state is poisoned".into(),
            })
    }
}

impl Transport for SimulatedTransport {
    fn describe(&self) -> &str {
        &self.endpoint
    }

    fn try_send(&mut self, command: &Command) -> Result<(), TransportError> {
        let mut amp = self.connect()?;
        amp.process_bytes(&command.encode());
        Ok(())
    }

    fn try_send_and_receive(&mut self, command: &Command) -> Result<Reply, TransportError> {
        let mut amp = self.connect()?;
        // Same as the serial transport: stale acknowledgements are dropped
        amp.clear_output();
        amp.process_bytes(&command.encode());
        match amp.take_output() {
            Some(bytes) => Reply::from_bytes(&bytes).map_err(|e| TransportError::ProtocolGarbage {
                endpoint: self.endpoint.clone(),
                source: e,
            }),
            None => Err(TransportError::Timeout {
                endpoint: self.endpoint.clone(),
            }),
        }
    }
}
