use crate::core::communication::transport::{ByteChannel, TransportType};
use crate::domain::config::ConnectionConfig;
use crate::domain::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, trace, warn};

/// Serial line reached through a TCP bridge (ser2net and similar)
pub struct TcpChannel {
    name: String,
    stream: TcpStream,
    inbound: VecDeque<u8>,
}

impl TcpChannel {
    pub async fn connect(name: &str, config: &ConnectionConfig) -> BridgeResult<Self> {
        let (host, port, timeout_ms) = match config {
            ConnectionConfig::Tcp {
                host,
                port,
                timeout_ms,
            } => (host.clone(), *port, *timeout_ms),
            _ => {
                return Err(BridgeError::Communication {
                    message: "Invalid connection type for TCP channel".to_string(),
                })
            }
        };

        // Connect with timeout
        let stream = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            TcpStream::connect((host.as_str(), port)),
        )
        .await
        .map_err(|_| BridgeError::Communication {
            message: format!("Connection timeout to {}:{}", host, port),
        })?
        .map_err(|e| BridgeError::Communication {
            message: format!("Failed to connect to {}:{}: {}", host, port, e),
        })?;

        // Bytes must leave one at a time
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        info!(channel = name, "TCP connection established to {}:{}", host, port);

        Ok(Self::from_stream(name, stream))
    }

    pub fn from_stream(name: &str, stream: TcpStream) -> Self {
        Self {
            name: name.to_string(),
            stream,
            inbound: VecDeque::new(),
        }
    }

    /// Move whatever the socket already holds into the look-ahead buffer
    fn fill(&mut self) -> BridgeResult<()> {
        let mut buffer = [0u8; 256];
        match self.stream.try_read(&mut buffer) {
            Ok(0) => Err(BridgeError::ChannelClosed {
                channel: self.name.clone(),
            }),
            Ok(n) => {
                trace!(channel = %self.name, "Received {} bytes over TCP", n);
                self.inbound.extend(&buffer[..n]);
                Ok(())
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ByteChannel for TcpChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    async fn send_byte(&mut self, byte: u8) -> BridgeResult<()> {
        self.stream.write_all(&[byte]).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn data_ready(&mut self) -> BridgeResult<bool> {
        if self.inbound.is_empty() {
            self.fill()?;
        }
        Ok(!self.inbound.is_empty())
    }

    async fn try_receive_byte(&mut self) -> BridgeResult<Option<u8>> {
        if self.inbound.is_empty() {
            self.fill()?;
        }
        Ok(self.inbound.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::communication::transport::receive_byte_within;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_channel_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = ConnectionConfig::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
            timeout_ms: 1000,
        };
        let (channel, accepted) = tokio::join!(TcpChannel::connect("debug", &config), listener.accept());
        let mut channel = channel.unwrap();
        let (mut peer, _) = accepted.unwrap();

        assert!(!channel.data_ready().await.unwrap());

        peer.write_all(b"OK").await.unwrap();
        let first = receive_byte_within(&mut channel, Duration::from_secs(1), Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(first, Some(b'O'));
        let second = receive_byte_within(&mut channel, Duration::from_secs(1), Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(second, Some(b'K'));

        channel.send_bytes(b"AT\n\r").await.unwrap();
        let mut echoed = [0u8; 4];
        peer.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"AT\n\r");
    }

    #[tokio::test]
    async fn test_tcp_channel_reports_closed_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stream, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let mut channel = TcpChannel::from_stream("module", stream.unwrap());
        drop(accepted.unwrap());

        let mut result = Ok(false);
        for _ in 0..100 {
            result = channel.data_ready().await;
            if result.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(matches!(result, Err(BridgeError::ChannelClosed { .. })));
    }

    #[tokio::test]
    async fn test_serial_config_rejected() {
        let config = ConnectionConfig::Serial {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: crate::domain::config::ParityConfig::None,
            flow_control: crate::domain::config::FlowControlConfig::None,
        };

        assert!(TcpChannel::connect("debug", &config).await.is_err());
    }
}
