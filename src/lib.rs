//! ESPBridge Library
//!
//! Brings an ESP8266 Wi-Fi module up as an access point with a listening
//! server, then relays every message one of its two clients sends to the
//! other, over a module serial channel mirrored to a debug channel.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use domain::error::{BridgeError, BridgeResult, ConfigError, ParseError};
pub use domain::config::BridgeConfig;
pub use crate::core::communication::{AtCommand, ByteChannel, CommandSender};
pub use crate::core::relay::{Bridge, BringUp, ClientId, ModuleState, Notification, NotificationParser, RelayRouter};
pub use infrastructure::memory::{MemoryChannel, MemoryHandle};
