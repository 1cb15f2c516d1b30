use crate::core::communication::command::{AtCommand, CommandSender};
use crate::core::relay::client::{ClientId, Notification};
use crate::domain::error::BridgeResult;
use serde::{Deserialize, Serialize};
use tracing::info;

/// What one relay wrote to the module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub source: ClientId,
    pub target: ClientId,
    pub length: usize,
    pub truncated: bool,
}

/// Forwards each notification to the client that did not send it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelayRouter;

impl RelayRouter {
    pub fn new() -> Self {
        Self
    }

    /// Issue `AT+CIPSEND=<peer>,<len>` then the payload and a carriage return.
    /// The module's `>` prompt is not awaited.
    pub async fn relay(&self, sender: &mut CommandSender, notification: &Notification) -> BridgeResult<RelayRecord> {
        let target = notification.client.peer();
        let length = notification.payload.len();

        sender.send_command(&AtCommand::Send { target, length }).await?;

        let mut data = Vec::with_capacity(length + 1);
        data.extend_from_slice(&notification.payload);
        data.push(b'\r');
        sender.send_raw(&data).await?;

        info!(
            source = %notification.client,
            target = %target,
            length,
            "relayed notification"
        );

        Ok(RelayRecord {
            source: notification.client,
            target,
            length,
            truncated: notification.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::MemoryChannel;

    #[tokio::test]
    async fn test_relay_addresses_peer_on_both_channels() {
        let module = MemoryChannel::new("module");
        let debug = MemoryChannel::new("debug");
        let (module_handle, debug_handle) = (module.handle(), debug.handle());
        let mut sender = CommandSender::new(Box::new(module), Box::new(debug), true);

        let record = RelayRouter::new()
            .relay(&mut sender, &Notification::new(ClientId::A, b"hello".to_vec()))
            .await
            .unwrap();

        assert_eq!(record.source, ClientId::A);
        assert_eq!(record.target, ClientId::B);
        assert_eq!(record.length, 5);

        let expected = b"AT+CIPSEND=1,5\n\rhello\r".to_vec();
        assert_eq!(module_handle.take_sent(), expected);
        assert_eq!(debug_handle.take_sent(), expected);
    }

    #[tokio::test]
    async fn test_relay_from_b_targets_a() {
        let module = MemoryChannel::new("module");
        let module_handle = module.handle();
        let mut sender = CommandSender::new(Box::new(module), Box::new(MemoryChannel::new("debug")), false);

        let record = RelayRouter::new()
            .relay(&mut sender, &Notification::new(ClientId::B, Vec::new()))
            .await
            .unwrap();

        assert_eq!(record.target, ClientId::A);
        assert_eq!(record.length, 0);
        assert_eq!(module_handle.take_sent(), b"AT+CIPSEND=0,0\n\r\r".to_vec());
    }
}
