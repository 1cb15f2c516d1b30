use crate::domain::error::BridgeResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Transport type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Serial,
    Tcp,
    Memory,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::Serial => write!(f, "serial"),
            TransportType::Tcp => write!(f, "tcp"),
            TransportType::Memory => write!(f, "memory"),
        }
    }
}

/// Byte-oriented half-duplex channel.
///
/// Sending blocks until the line accepted the byte; receiving never waits.
#[async_trait]
pub trait ByteChannel: Send {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Get the transport type
    fn transport_type(&self) -> TransportType;

    /// Transmit one byte
    async fn send_byte(&mut self, byte: u8) -> BridgeResult<()>;

    /// Whether at least one byte is pending, without consuming it
    async fn data_ready(&mut self) -> BridgeResult<bool>;

    /// Take the next pending byte, or `None` if nothing has arrived
    async fn try_receive_byte(&mut self) -> BridgeResult<Option<u8>>;

    /// Transmit bytes in order
    async fn send_bytes(&mut self, data: &[u8]) -> BridgeResult<()> {
        for &byte in data {
            self.send_byte(byte).await?;
        }
        Ok(())
    }
}

/// Poll `channel` until a byte arrives or `timeout` elapses, sleeping
/// `poll_interval` between attempts so other tasks keep running.
pub async fn receive_byte_within(
    channel: &mut dyn ByteChannel,
    timeout: Duration,
    poll_interval: Duration,
) -> BridgeResult<Option<u8>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(byte) = channel.try_receive_byte().await? {
            return Ok(Some(byte));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
