//! The amplifier facade

use cxa_protocol::{command, Command, Profile, Reply};
use cxa_transport::Transport;
use tracing::{debug, info, warn};

use crate::companion::{step_volume, Companion, VolumeStep};
use crate::error::DeviceError;
use crate::state::{DeviceState, DeviceStatus, Feature};

/// One CXA amplifier behind a transport
///
/// Holds the cached state last read by [`CxaDevice::refresh`]. Actions are
/// fire-and-forget: they do not touch the cache, the next refresh does.
pub struct CxaDevice {
    name: String,
    profile: Profile,
    transport: Box<dyn Transport>,
    companion: Option<Box<dyn Companion>>,
    state: DeviceState,
}

impl CxaDevice {
    /// Create a device with no companion streamer
    pub fn new(name: impl Into<String>, profile: Profile, transport: Box<dyn Transport>) -> Self {
        let name = name.into();
        info!(
            %name,
            %profile,
            transport = transport.describe(),
            "Created amplifier device"
        );
        Self {
            name,
            profile,
            transport,
            companion: None,
            state: DeviceState::default(),
        }
    }

    /// Attach a companion streamer for volume steps
    pub fn with_companion(mut self, companion: Box<dyn Companion>) -> Self {
        self.companion = Some(companion);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn is_on(&self) -> bool {
        self.state.power
    }

    pub fn is_muted(&self) -> bool {
        self.state.muted
    }

    /// Last decoded source, `None` until a refresh has seen one
    pub fn source(&self) -> Option<&'static str> {
        self.state.source
    }

    /// Selectable sources for this profile, sorted
    pub fn source_list(&self) -> Vec<&'static str> {
        cxa_protocol::source_list(self.profile)
    }

    /// Selectable sound modes, sorted
    pub fn sound_mode_list(&self) -> Vec<&'static str> {
        cxa_protocol::sound_mode_list()
    }

    /// Volume stepping is only offered with a companion streamer
    pub fn supported_features(&self) -> Vec<Feature> {
        let mut features = Feature::BASE.to_vec();
        if self.companion.is_some() {
            features.push(Feature::VolumeStep);
        }
        features
    }

    pub fn describe_transport(&self) -> &str {
        self.transport.describe()
    }

    /// Snapshot for display or JSON output
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            name: self.name.clone(),
            model: self.profile,
            transport: self.transport.describe().to_string(),
            state: self.state.clone(),
            features: self.supported_features(),
        }
    }

    /// Poll power, source and mute, in that order
    ///
    /// Never fails. A query that gets nothing usable back leaves its field
    /// as it was.
    pub fn refresh(&mut self) {
        if let Some(reply) = self.query(&command::get_power()) {
            self.state.power = cxa_protocol::decode_power_state(reply.as_str());
        }

        if let Some(reply) = self.query(&command::get_source()) {
            match cxa_protocol::decode_source_reply(self.profile, reply.as_str()) {
                Ok(label) => self.state.source = Some(label),
                Err(e) => warn!(
                    device = %self.name,
                    error = %e,
                    "Keeping previous source"
                ),
            }
        }

        if let Some(reply) = self.query(&command::get_mute()) {
            self.state.muted = cxa_protocol::decode_mute_state(reply.as_str());
        }

        debug!(device = %self.name, state = ?self.state, "Refreshed");
    }

    /// Exchange one query; `None` when the reply is empty or unreadable
    fn query(&mut self, command: &Command) -> Option<Reply> {
        match self.transport.send_and_receive(command) {
            Ok(reply) if reply.is_empty() => None,
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(device = %self.name, %command, error = %e, "Unusable reply");
                None
            }
        }
    }

    pub fn turn_on(&mut self) {
        self.transport.send(&command::power(true));
    }

    pub fn turn_off(&mut self) {
        self.transport.send(&command::power(false));
    }

    pub fn mute(&mut self, muted: bool) {
        self.transport.send(&command::mute(muted));
    }

    /// Switch input; an unknown label is rejected before anything is sent
    pub fn select_source(&mut self, label: &str) -> Result<(), DeviceError> {
        let command = cxa_protocol::encode_select_source(self.profile, label)?;
        self.transport.send(&command);
        Ok(())
    }

    /// Switch speaker output; an unknown label is rejected before anything is sent
    pub fn select_sound_mode(&mut self, label: &str) -> Result<(), DeviceError> {
        let command = cxa_protocol::encode_sound_mode(label)?;
        self.transport.send(&command);
        Ok(())
    }

    pub fn volume_up(&mut self) -> Result<(), DeviceError> {
        self.step_volume(VolumeStep::Up)
    }

    pub fn volume_down(&mut self) -> Result<(), DeviceError> {
        self.step_volume(VolumeStep::Down)
    }

    fn step_volume(&mut self, step: VolumeStep) -> Result<(), DeviceError> {
        let companion = self.companion.as_deref().ok_or(DeviceError::NoCompanion)?;
        step_volume(companion, step).map_err(|e| {
            warn!(device = %self.name, ?step, error = %e, "Volume step failed");
            DeviceError::Companion(e)
        })
    }
}

impl std::fmt::Debug for CxaDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CxaDevice")
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("transport", &self.transport.describe())
            .field("state", &self.state)
            .finish()
    }
}
