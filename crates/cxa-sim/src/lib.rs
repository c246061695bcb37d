//! CXA Simulation Library
//!
//! Lets the device facade and the CLI run without an amplifier attached:
//!
//! - **VirtualAmplifier**: answers the serial protocol the way a CXA61 or
//!   CXA81 does and tracks its state
//! - **SimulatedTransport**: a [`cxa_transport::Transport`] wired straight
//!   to a virtual amplifier, with a switch to take it offline
//!
//! # Example
//!
//! ```rust
//! use cxa_protocol::{command, Profile};
//! use cxa_sim::{SimulatedTransport, VirtualAmplifier};
//! use cxa_transport::Transport;
//!
//! let mut transport = SimulatedTransport::new(VirtualAmplifier::new("sim", Profile::Cxa61));
//!
//! transport.send(&command::power(true));
//! let reply = transport.send_and_receive(&command::get_power()).unwrap();
//! assert_eq!(reply.as_str(), "#02,01,1");
//! ```

pub mod amplifier;
pub mod transport;

pub use amplifier::VirtualAmplifier;
pub use transport::SimulatedTransport;
