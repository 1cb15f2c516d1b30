use crate::core::communication::transport::{ByteChannel, TransportType};
use crate::domain::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Buffers {
    inbound: VecDeque<u8>,
    sent: Vec<u8>,
    closed: bool,
}

/// In-memory channel. Inbound bytes are fed through a [`MemoryHandle`],
/// sent bytes are collected for inspection.
#[derive(Debug)]
pub struct MemoryChannel {
    name: String,
    buffers: Arc<Mutex<Buffers>>,
}

/// Shared view of a [`MemoryChannel`] that stays usable after the channel
/// has been moved into a bridge.
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    buffers: Arc<Mutex<Buffers>>,
}

fn lock(buffers: &Mutex<Buffers>) -> MutexGuard<'_, Buffers> {
    buffers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffers: Arc::new(Mutex::new(Buffers::default())),
        }
    }

    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            buffers: Arc::clone(&self.buffers),
        }
    }
}

impl MemoryHandle {
    /// Queue bytes as if they arrived on the line
    pub fn feed(&self, data: &[u8]) {
        lock(&self.buffers).inbound.extend(data.iter().copied());
    }

    /// Drain everything sent so far
    pub fn take_sent(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.buffers).sent)
    }

    /// Copy of everything sent so far
    pub fn sent(&self) -> Vec<u8> {
        lock(&self.buffers).sent.clone()
    }

    pub fn pending(&self) -> usize {
        lock(&self.buffers).inbound.len()
    }

    /// Make further sends fail, as an unplugged port would
    pub fn close(&self) {
        lock(&self.buffers).closed = true;
    }
}

#[async_trait]
impl ByteChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Memory
    }

    async fn send_byte(&mut self, byte: u8) -> BridgeResult<()> {
        let mut buffers = lock(&self.buffers);
        if buffers.closed {
            return Err(BridgeError::ChannelClosed {
                channel: self.name.clone(),
            });
        }
        buffers.sent.push(byte);
        Ok(())
    }

    async fn data_ready(&mut self) -> BridgeResult<bool> {
        Ok(!lock(&self.buffers).inbound.is_empty())
    }

    async fn try_receive_byte(&mut self) -> BridgeResult<Option<u8>> {
        Ok(lock(&self.buffers).inbound.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_and_receive() {
        tokio_test::block_on(async {
            let mut channel = MemoryChannel::new("module");
            let handle = channel.handle();
            assert!(!channel.data_ready().await.unwrap());

            handle.feed(b"OK");
            assert!(channel.data_ready().await.unwrap());
            assert_eq!(handle.pending(), 2);
            assert_eq!(channel.try_receive_byte().await.unwrap(), Some(b'O'));
            assert_eq!(channel.try_receive_byte().await.unwrap(), Some(b'K'));
            assert_eq!(channel.try_receive_byte().await.unwrap(), None);
        });
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_sends() {
        let mut channel = MemoryChannel::new("debug");
        let handle = channel.handle();

        channel.send_byte(b'a').await.unwrap();
        handle.close();
        let err = channel.send_byte(b'b').await.unwrap_err();
        assert!(matches!(err, BridgeError::ChannelClosed { .. }));
        assert_eq!(handle.take_sent(), vec![b'a']);
        assert!(handle.sent().is_empty());
    }
}
