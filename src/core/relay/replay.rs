use crate::core::communication::command::CommandSender;
use crate::core::relay::client::Notification;
use crate::core::relay::parser::NotificationParser;
use crate::core::relay::router::{RelayRecord, RelayRouter};
use crate::domain::config::RelayConfig;
use crate::domain::error::BridgeResult;
use crate::infrastructure::memory::MemoryChannel;
use std::time::Duration;

/// Outcome for one notification found in a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEntry {
    Relayed {
        notification: Notification,
        record: RelayRecord,
        /// Bytes the bridge would have written to the module
        output: Vec<u8>,
    },
    Dropped {
        error: String,
    },
}

/// Run a captured module stream through the parser and router without any
/// hardware attached. The capture is complete, so nothing is waited for.
pub async fn replay_capture(relay: &RelayConfig, capture: &[u8]) -> BridgeResult<Vec<ReplayEntry>> {
    let module = MemoryChannel::new("replay-module");
    let module_handle = module.handle();
    module_handle.feed(capture);

    let mut sender = CommandSender::new(Box::new(module), Box::new(MemoryChannel::new("replay-debug")), false);
    let mut parser = NotificationParser::with_limits(relay.payload_capacity, Duration::ZERO, Duration::ZERO);
    let router = RelayRouter::new();
    let mut entries = Vec::new();

    while module_handle.pending() > 0 {
        match parser.poll_notification(sender.module_mut()).await {
            Ok(Some(notification)) => {
                let record = router.relay(&mut sender, &notification).await?;
                entries.push(ReplayEntry::Relayed {
                    notification,
                    record,
                    output: module_handle.take_sent(),
                });
            }
            Ok(None) => {}
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => entries.push(ReplayEntry::Dropped {
                error: err.to_string(),
            }),
        }
    }

    Ok(entries)
}
