//! Companion streamer (CXN) volume control
//!
//! The amplifier's serial protocol has no volume command. When a Cambridge
//! CXN streamer drives the amplifier, its HTTP API can step the volume
//! instead, but only while pre-amp mode is off. A step is therefore three
//! requests: disable pre-amp mode, step, re-enable pre-amp mode.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::CompanionError;

/// Disable pre-amp mode so the streamer accepts volume steps
pub const PRE_AMP_OFF: &str = "pre_amp_mode=false";
/// Re-enable pre-amp mode
pub const PRE_AMP_ON: &str = "pre_amp_mode=true";
/// Step volume up by one
pub const VOLUME_UP: &str = "volume_step_change=+1";
/// Step volume down by one
pub const VOLUME_DOWN: &str = "volume_step_change=-1";

/// Timeout for each companion request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Direction of a volume step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeStep {
    Up,
    Down,
}

impl VolumeStep {
    fn query(self) -> &'static str {
        match self {
            VolumeStep::Up => VOLUME_UP,
            VolumeStep::Down => VOLUME_DOWN,
        }
    }
}

/// HTTP surface of a companion streamer
pub trait Companion: Send {
    /// Host the requests go to
    fn host(&self) -> &str;

    /// `GET /smoip/zone/state?<query>`, discarding the body
    fn get(&self, query: &str) -> Result<(), CompanionError>;
}

/// Run the three-request volume step against `companion`
///
/// Stops at the first failure. There is no rollback, so a failed step
/// can leave the streamer with pre-amp mode disabled.
pub fn step_volume(companion: &dyn Companion, step: VolumeStep) -> Result<(), CompanionError> {
    debug!(host = companion.host(), ?step, "Stepping volume");
    for query in [PRE_AMP_OFF, step.query(), PRE_AMP_ON] {
        companion.get(query)?;
    }
    Ok(())
}

/// Companion reached over plain HTTP with `reqwest`
#[derive(Debug)]
pub struct HttpCompanion {
    host: String,
    client: Client,
}

impl HttpCompanion {
    /// Create a client for the streamer at `host` (name or address, optional port)
    pub fn new(host: impl Into<String>) -> Result<Self, CompanionError> {
        let host = host.into();
        // The streamer is on the local network; never route through a proxy
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()?;
        info!(%host, "Using companion streamer for volume");
        Ok(Self { host, client })
    }

    /// URL of the zone state endpoint with `query` appended
    pub fn state_url(&self, query: &str) -> String {
        format!("http://{}/smoip/zone/state?{}", self.host, query)
    }
}

impl Companion for HttpCompanion {
    fn host(&self) -> &str {
        &self.host
    }

    fn get(&self, query: &str) -> Result<(), CompanionError> {
        let url = self.state_url(query);
        debug!(%url, "Companion request");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        // Body is a JSON state dump we have no use for
        let _ = response.bytes()?;

        if !status.is_success() {
            return Err(CompanionError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
