//! CXA Device Facade
//!
//! Composes the protocol codec and a transport into [`CxaDevice`]: one
//! amplifier with a cached [`DeviceState`], a [`CxaDevice::refresh`] poll
//! and a handful of fire-and-forget actions. Volume has no serial command
//! and goes through an optional companion streamer instead (see
//! [`companion`]).
//!
//! The host decides when to poll and where devices live. [`setup`] builds
//! a device from a [`DeviceConfig`] and hands it to a registration
//! callback; logging goes through `tracing` to whatever subscriber the
//! host installed.
//!
//! # Example
//!
//! ```no_run
//! use cxa_device::{setup, DeviceConfig};
//!
//! let config = DeviceConfig::from_json(
//!     r#"{ "model": "CXA81", "transport": { "type": "tcp", "host": "amp-relay", "port": 4001 } }"#,
//! )?;
//!
//! let mut devices = Vec::new();
//! setup(&config, |device| devices.push(device))?;
//!
//! devices[0].refresh();
//! println!("{}", devices[0].status());
//! # Ok::<(), cxa_device::DeviceError>(())
//! ```

pub mod companion;
pub mod config;
pub mod device;
pub mod error;
pub mod state;

pub use companion::{Companion, HttpCompanion, VolumeStep};
pub use config::{DeviceConfig, TransportConfig, DEFAULT_NAME};
pub use device::CxaDevice;
pub use error::{CompanionError, ConfigError, DeviceError};
pub use state::{DeviceState, DeviceStatus, Feature};

use cxa_transport::Transport;

/// Build the device described by `config` and pass it to `register`
///
/// The configured transport is constructed here; for a serial connection
/// that opens the port. Nothing is registered if any step fails.
pub fn setup<F>(config: &DeviceConfig, register: F) -> Result<(), DeviceError>
where
    F: FnOnce(CxaDevice),
{
    config.validate()?;
    let transport = config.transport.connect()?;
    setup_with_transport(config, transport, register)
}

/// Like [`setup`], but with a transport supplied by the caller
///
/// The configured transport is validated but not used.
pub fn setup_with_transport<F>(
    config: &DeviceConfig,
    transport: Box<dyn Transport>,
    register: F,
) -> Result<(), DeviceError>
where
    F: FnOnce(CxaDevice),
{
    let profile = config.validate()?;

    let mut device = CxaDevice::new(config.name.clone(), profile, transport);
    if let Some(host) = config.companion_host() {
        device = device.with_companion(Box::new(HttpCompanion::new(host)?));
    }

    register(device);
    Ok(())
}
