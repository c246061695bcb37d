//! Cached amplifier state

use std::fmt;

use cxa_protocol::Profile;
use serde::Serialize;

/// Last known amplifier state, as of the most recent refresh
///
/// Fields keep their previous value when a query gets no usable reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    /// Amplifier is on (not in standby)
    pub power: bool,
    /// Output is muted
    pub muted: bool,
    /// Current source label; unknown until a refresh decodes one
    pub source: Option<&'static str>,
}

/// Operations a host may offer for this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    TurnOn,
    TurnOff,
    Mute,
    SelectSource,
    SelectSoundMode,
    /// Only with a companion streamer
    VolumeStep,
}

impl Feature {
    /// Features every device supports
    pub const BASE: [Feature; 5] = [
        Feature::TurnOn,
        Feature::TurnOff,
        Feature::Mute,
        Feature::SelectSource,
        Feature::SelectSoundMode,
    ];
}

/// Snapshot of a device for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub name: String,
    pub model: Profile,
    pub transport: String,
    #[serde(flatten)]
    pub state: DeviceState,
    pub features: Vec<Feature>,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) via {}", self.name, self.model, self.transport)?;
        writeln!(f, "  power:  {}", if self.state.power { "on" } else { "standby" })?;
        writeln!(f, "  muted:  {}", if self.state.muted { "yes" } else { "no" })?;
        write!(f, "  source: {}", self.state.source.unwrap_or("unknown"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = DeviceState::default();
        assert!(!state.power);
        assert!(!state.muted);
        assert_eq!(state.source, None);
    }

    #[test]
    fn test_status_json() {
        let status = DeviceStatus {
            name: "Amp".into(),
            model: Profile::Cxa81,
            transport: "/dev/ttyUSB0".into(),
            state: DeviceState {
                power: true,
                muted: false,
                source: Some("XLR"),
            },
            features: vec![Feature::TurnOn, Feature::VolumeStep],
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["model"], "CXA81");
        assert_eq!(json["power"], true);
        assert_eq!(json["source"], "XLR");
        assert_eq!(json["features"][1], "volume_step");
    }

    #[test]
    fn test_status_display() {
        let status = DeviceStatus {
            name: "Amp".into(),
            model: Profile::Cxa61,
            transport: "relay:4001".into(),
            state: DeviceState::default(),
            features: Feature::BASE.to_vec(),
        };
        let text = status.to_string();
        assert!(text.starts_with("Amp (CXA61) via relay:4001"));
        assert!(text.contains("standby"));
        assert!(text.contains("source: unknown"));
    }
}
