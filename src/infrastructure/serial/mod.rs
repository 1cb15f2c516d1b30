// Serial module - UART channel implementation
pub mod channel;

pub use channel::SerialChannel;
