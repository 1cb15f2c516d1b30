// Relay module - Module bring-up and notification relaying
pub mod bridge;
pub mod bringup;
pub mod client;
pub mod parser;
pub mod replay;
pub mod router;

pub use bridge::{Bridge, ModuleState, RelayStats};
pub use bringup::BringUp;
pub use client::{ClientId, Notification, PayloadBuffer};
pub use parser::NotificationParser;
pub use replay::{replay_capture, ReplayEntry};
pub use router::{RelayRecord, RelayRouter};
