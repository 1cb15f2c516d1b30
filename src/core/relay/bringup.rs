use crate::core::communication::command::{AtCommand, CommandSender, WifiMode, LINE_TERMINATOR};
use crate::core::communication::transport::receive_byte_within;
use crate::domain::config::{AccessPointConfig, BridgeConfig, NetworkConfig};
use crate::domain::error::ConfigError;
use std::time::Duration;
use tracing::{info, warn};

/// Leading characters of the module's `OK` response
pub const ACKNOWLEDGEMENT: [u8; 2] = *b"OK";

/// Written to the debug channel when the probe is not acknowledged
pub const FAILURE_DIAGNOSTIC: &str = "Error ESP";

/// Terminator of the access point command in legacy mode
const LEGACY_ACCESS_POINT_TERMINATOR: &[u8] = b" ";

/// Configures the module as an access point running a multi-connection server.
#[derive(Debug, Clone)]
pub struct BringUp {
    access_point: AccessPointConfig,
    network: NetworkConfig,
    server_port: u16,
    probe_timeout: Duration,
    poll_interval: Duration,
    legacy_access_point_terminator: bool,
}

impl BringUp {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            access_point: config.access_point.clone(),
            network: config.network.clone(),
            server_port: config.server.port,
            probe_timeout: config.bringup.probe_timeout(),
            poll_interval: config.relay.poll_interval(),
            legacy_access_point_terminator: config.bringup.legacy_access_point_terminator,
        }
    }

    /// Setup commands in issue order, each with its terminator
    pub fn setup_commands(&self) -> Vec<(AtCommand, &'static [u8])> {
        let access_point_terminator = if self.legacy_access_point_terminator {
            LEGACY_ACCESS_POINT_TERMINATOR
        } else {
            LINE_TERMINATOR
        };

        vec![
            (AtCommand::SetMode(WifiMode::AccessPoint), LINE_TERMINATOR),
            (
                AtCommand::ConfigureAccessPoint {
                    ssid: self.access_point.ssid.clone(),
                    passphrase: self.access_point.passphrase.clone(),
                    channel: self.access_point.channel,
                    encryption: self.access_point.encryption,
                },
                access_point_terminator,
            ),
            (
                AtCommand::SetStationAddress {
                    ip: self.network.ip.clone(),
                    gateway: self.network.gateway.clone(),
                    netmask: self.network.netmask.clone(),
                },
                LINE_TERMINATOR,
            ),
            (AtCommand::EnableMultiplexing, LINE_TERMINATOR),
            (AtCommand::StartServer { port: self.server_port }, LINE_TERMINATOR),
        ]
    }

    /// Probe the module, then issue the setup commands without checking
    /// their responses.
    pub async fn configure(&self, sender: &mut CommandSender) -> Result<(), ConfigError> {
        info!("probing module");
        sender.send_command(&AtCommand::Probe).await?;

        let received = self.read_acknowledgement(sender).await?;
        if received != ACKNOWLEDGEMENT {
            let received = String::from_utf8_lossy(&received).into_owned();
            warn!(%received, "liveness probe not acknowledged");
            sender.debug_message(FAILURE_DIAGNOSTIC).await?;
            return Err(ConfigError::NoResponse { received });
        }
        info!("module acknowledged probe");

        if self.legacy_access_point_terminator {
            warn!("access point command terminated with a space instead of the line terminator");
        }

        for (command, terminator) in self.setup_commands() {
            info!(command = %command, "configuring module");
            sender.send_command_with(&command, terminator).await?;
        }

        info!(
            ssid = %self.access_point.ssid,
            port = self.server_port,
            "module bring-up complete"
        );
        Ok(())
    }

    /// Up to two response bytes; fewer if the module falls silent.
    async fn read_acknowledgement(&self, sender: &mut CommandSender) -> Result<Vec<u8>, ConfigError> {
        let mut received = Vec::with_capacity(ACKNOWLEDGEMENT.len());
        for _ in 0..ACKNOWLEDGEMENT.len() {
            match receive_byte_within(sender.module_mut(), self.probe_timeout, self.poll_interval).await? {
                Some(byte) => received.push(byte),
                None => break,
            }
        }
        Ok(received)
    }
}
