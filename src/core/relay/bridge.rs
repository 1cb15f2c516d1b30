use crate::core::communication::command::CommandSender;
use crate::core::communication::transport::ByteChannel;
use crate::core::relay::bringup::BringUp;
use crate::core::relay::parser::NotificationParser;
use crate::core::relay::router::{RelayRecord, RelayRouter};
use crate::domain::config::BridgeConfig;
use crate::domain::error::{BridgeError, BridgeResult, ParseError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

/// Written to the debug channel at start-up
pub const BANNER: &str = "ESP8266 bridge\n\r\n\r";
pub const HALT_MESSAGE: &str = "ERROR\n\r";
pub const SHUTDOWN_MESSAGE: &str = "Shutdown\n\r";

/// Lifecycle of the module as seen by the bridge. `Halted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    Unconfigured,
    Configured,
    Serving,
    Halted,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleState::Unconfigured => write!(f, "Unconfigured"),
            ModuleState::Configured => write!(f, "Configured"),
            ModuleState::Serving => write!(f, "Serving"),
            ModuleState::Halted => write!(f, "Halted"),
        }
    }
}

/// Relay counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    pub relayed: u64,
    pub dropped: u64,
    pub truncated: u64,
    pub noise_bytes: u64,
}

/// Bring-up followed by the unbounded poll/relay loop
pub struct Bridge {
    sender: CommandSender,
    parser: NotificationParser,
    router: RelayRouter,
    bringup: BringUp,
    state: ModuleState,
    stats: RelayStats,
    settle: Duration,
    halt_delay: Duration,
    poll_interval: Duration,
}

impl Bridge {
    pub fn new(config: &BridgeConfig, module: Box<dyn ByteChannel>, debug: Box<dyn ByteChannel>) -> Self {
        Self {
            sender: CommandSender::new(module, debug, config.relay.mirror_to_debug),
            parser: NotificationParser::new(&config.relay),
            router: RelayRouter::new(),
            bringup: BringUp::new(config),
            state: ModuleState::Unconfigured,
            stats: RelayStats::default(),
            settle: config.bringup.settle(),
            halt_delay: config.bringup.halt_delay(),
            poll_interval: config.relay.poll_interval(),
        }
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            noise_bytes: self.parser.noise_bytes(),
            ..self.stats.clone()
        }
    }

    /// Announce on the debug channel and bring the module up. A failed
    /// bring-up halts the bridge for good after `halt_delay`.
    pub async fn start(&mut self) -> BridgeResult<()> {
        if self.state != ModuleState::Unconfigured {
            return Err(BridgeError::Communication {
                message: format!("cannot start bridge in state {}", self.state),
            });
        }

        self.sender.debug_message(BANNER).await?;

        match self.bringup.configure(&mut self.sender).await {
            Ok(()) => {
                self.state = ModuleState::Configured;
                tokio::time::sleep(self.settle).await;
                self.state = ModuleState::Serving;
                info!("bridge serving");
                Ok(())
            }
            Err(err) => {
                self.state = ModuleState::Halted;
                error!(error = %err, "module bring-up failed, halting");
                self.sender.debug_message(HALT_MESSAGE).await?;
                tokio::time::sleep(self.halt_delay).await;
                self.sender.debug_message(SHUTDOWN_MESSAGE).await?;
                Err(err.into())
            }
        }
    }

    /// One loop iteration: poll for a notification and relay it. Errors
    /// confined to one notification are logged and swallowed.
    pub async fn step(&mut self) -> BridgeResult<Option<RelayRecord>> {
        if self.state != ModuleState::Serving {
            return Err(BridgeError::Communication {
                message: format!("bridge is not serving (state {})", self.state),
            });
        }

        match self.parser.poll_notification(self.sender.module_mut()).await {
            Ok(Some(notification)) => {
                if notification.truncated {
                    let err = ParseError::Truncated {
                        capacity: self.parser.capacity(),
                    };
                    warn!(error = %err, client = %notification.client, "delivering truncated payload");
                    self.stats.truncated += 1;
                }
                // Sender id goes to the debug channel ahead of the relayed traffic
                self.sender.mirror_byte(notification.client.as_byte()).await?;
                let record = self.router.relay(&mut self.sender, &notification).await?;
                self.stats.relayed += 1;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                warn!(error = %err, "dropping notification");
                self.stats.dropped += 1;
                if let ParseError::InvalidClientId { byte } = err {
                    self.sender.debug_hex(byte).await?;
                }
                Ok(None)
            }
        }
    }

    /// Start, then relay until a channel fails.
    pub async fn run(&mut self) -> BridgeResult<()> {
        self.start().await?;
        loop {
            if self.step().await?.is_none() {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }
}
