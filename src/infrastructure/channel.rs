use crate::core::communication::transport::ByteChannel;
use crate::domain::config::ConnectionConfig;
use crate::domain::error::BridgeResult;
use crate::infrastructure::serial::SerialChannel;
use crate::infrastructure::tcp::TcpChannel;

/// Open the channel described by `config`
pub async fn open_channel(name: &str, config: &ConnectionConfig) -> BridgeResult<Box<dyn ByteChannel>> {
    match config {
        ConnectionConfig::Serial { .. } => Ok(Box::new(SerialChannel::open(name, config)?)),
        ConnectionConfig::Tcp { .. } => Ok(Box::new(TcpChannel::connect(name, config).await?)),
    }
}
