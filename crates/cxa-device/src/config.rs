//! Device configuration
//!
//! A device is described by a small JSON document:
//!
//! ```json
//! {
//!   "name": "Living Room Amp",
//!   "model": "CXA81",
//!   "transport": { "type": "serial", "device": "/dev/ttyUSB0" },
//!   "companion_host": "192.168.1.20"
//! }
//! ```

use cxa_protocol::Profile;
use cxa_transport::{ssh, SerialTransport, SshRelayTransport, TcpRelayTransport, Transport, TransportError};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name used when the configuration does not give one
pub const DEFAULT_NAME: &str = "Cambridge Audio CXA";

/// How to reach the amplifier's serial port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Locally attached serial port
    Serial { device: String },
    /// TCP relay such as `ser2net`
    Tcp { host: String, port: u16 },
    /// Serial adapter on a remote host reached with `ssh`
    Ssh {
        host: String,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tty: Option<String>,
    },
}

impl TransportConfig {
    /// Check required fields are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TransportConfig::Serial { device } => require("transport.device", device),
            TransportConfig::Tcp { host, port } => {
                require("transport.host", host)?;
                if *port == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: "transport.port",
                        reason: "port must be non-zero".into(),
                    });
                }
                Ok(())
            }
            TransportConfig::Ssh {
                host,
                username,
                tty,
            } => {
                require("transport.host", host)?;
                require("transport.username", username)?;
                ssh_destination("transport.host", host)?;
                ssh_destination("transport.username", username)?;
                if let Some(tty) = tty {
                    require("transport.tty", tty)?;
                    if !ssh::is_safe_path(tty) {
                        return Err(ConfigError::InvalidValue {
                            field: "transport.tty",
                            reason: format!("{tty:?} is not a plain absolute device path"),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Build the transport; opens the port for serial connections
    pub fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(match self {
            TransportConfig::Serial { device } => Box::new(SerialTransport::open(device)?),
            TransportConfig::Tcp { host, port } => Box::new(TcpRelayTransport::new(host, *port)),
            TransportConfig::Ssh {
                host,
                username,
                tty,
            } => {
                let mut transport = SshRelayTransport::new(host, username);
                if let Some(tty) = tty {
                    transport = transport.with_tty(tty);
                }
                Box::new(transport)
            }
        })
    }
}

/// Configuration of one amplifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Display name
    #[serde(default = "default_name")]
    pub name: String,
    /// `CXA61` or `CXA81`, case-insensitive
    pub model: String,
    /// Connection to the amplifier
    pub transport: TransportConfig,
    /// Host of a CXN streamer used for volume steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion_host: Option<String>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn ssh_destination(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if !ssh::is_safe_destination(value) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("{value:?} would be read as an ssh option"),
        });
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(field));
    }
    Ok(())
}

impl DeviceConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the whole configuration and resolve the model
    pub fn validate(&self) -> Result<Profile, ConfigError> {
        require("name", &self.name)?;
        let profile = self.profile()?;
        self.transport.validate()?;
        Ok(profile)
    }

    /// The amplifier profile named by `model`
    pub fn profile(&self) -> Result<Profile, ConfigError> {
        require("model", &self.model)?;
        self.model
            .parse()
            .map_err(|e: cxa_protocol::CodecError| ConfigError::InvalidValue {
                field: "model",
                reason: e.to_string(),
            })
    }

    /// Companion host, if one is configured and non-blank
    pub fn companion_host(&self) -> Option<&str> {
        self.companion_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}
