//! Rust library for controlling Dynaudio Connect amplifiers
//!
//! The Connect hub speaks a small binary protocol over TCP (port 1901). This
//! library provides an async API that:
//!
//! - Encodes commands into checksummed frames
//! - Turns the hub on and off, sets volume and mute, and selects sources
//! - Queries the hub and keeps a cached state snapshot for display
//!
//! # Quick Start
//!
//! ```no_run
//! use dynaudio_connect::{DeviceConfig, DynaudioDevice};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DeviceConfig::new("192.168.1.50").with_name("Living Room");
//!     let device = DynaudioDevice::connect(&config).await;
//!
//!     device.turn_on().await?;
//!     device.set_volume(0.4).await?;
//!     device.select_source("Optical").await?;
//!
//!     // Read the state back
//!     device.refresh().await;
//!     println!(
//!         "{} is {} at {:.0}% on {}",
//!         device.name(),
//!         device.power_state(),
//!         device.volume_level() * 100.0,
//!         device.current_source()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Transport
//!
//! The hub handles one request per connection. Every command opens a socket,
//! writes one frame and closes it. Commands are not acknowledged; if the hub
//! cannot be reached the command is logged at warn level and dropped.
//!
//! There is no documented query command. [`DynaudioDevice::refresh`] sends a
//! command to an idle zone and decodes whatever comes back. No answer at all
//! is read as "powered off", so an unreachable hub looks the same as one that
//! is switched off; [`DynaudioDevice::responding`] tells the two apart.
//!
//! # Architecture
//!
//! - **Device**: high-level session with cached state ([`DynaudioDevice`])
//! - **Connection**: one-shot TCP exchanges
//! - **Protocol**: frame codec, checksum and command payloads
//! - **Types**: source table, zones and the state snapshot

mod config;
mod connection;
mod device;
mod error;
pub mod protocol;
mod types;

// Public exports
pub use config::DeviceConfig;
pub use device::DynaudioDevice;
pub use error::{DynaudioError, Result};
pub use protocol::{Command, Frame, ReceivedFrame, StateReport};
pub use types::{
    DeviceState, Feature, PowerState, Source, Zone, DEFAULT_NAME, DEFAULT_PORT, DEFAULT_ZONE,
    MAX_VOLUME, SOURCES, SUPPORTED_FEATURES,
};
