// Communication module - Byte channels and AT command output
pub mod command;
pub mod transport;

pub use command::{AtCommand, CommandSender, WifiMode, LINE_TERMINATOR};
pub use transport::{ByteChannel, TransportType};
