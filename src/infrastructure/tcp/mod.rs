// TCP module - Serial-over-TCP channel implementation
pub mod channel;

pub use channel::TcpChannel;
