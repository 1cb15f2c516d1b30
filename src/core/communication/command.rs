use crate::core::communication::transport::ByteChannel;
use crate::core::relay::client::ClientId;
use crate::domain::config::Encryption;
use crate::domain::error::BridgeResult;
use tracing::debug;

/// Terminator the module expects after every command
pub const LINE_TERMINATOR: &[u8] = b"\n\r";

/// Module Wi-Fi mode. The bridge only ever runs the module as an access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    AccessPoint,
}

impl WifiMode {
    pub fn code(self) -> u8 {
        match self {
            WifiMode::AccessPoint => 2,
        }
    }
}

/// Commands of the module's AT dialect used by the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    Probe,
    SetMode(WifiMode),
    ConfigureAccessPoint {
        ssid: String,
        passphrase: String,
        channel: u8,
        encryption: Encryption,
    },
    SetStationAddress {
        ip: String,
        gateway: String,
        netmask: String,
    },
    EnableMultiplexing,
    StartServer {
        port: u16,
    },
    Send {
        target: ClientId,
        length: usize,
    },
}

impl std::fmt::Display for AtCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtCommand::Probe => write!(f, "AT"),
            AtCommand::SetMode(mode) => write!(f, "AT+CWMODE={}", mode.code()),
            AtCommand::ConfigureAccessPoint {
                ssid,
                passphrase,
                channel,
                encryption,
            } => write!(
                f,
                "AT+CWSAP=\"{}\",\"{}\",{},{}",
                ssid,
                passphrase,
                channel,
                encryption.code()
            ),
            AtCommand::SetStationAddress {
                ip,
                gateway,
                netmask,
            } => write!(f, "AT+CIPSTA=\"{}\",\"{}\",\"{}\"", ip, gateway, netmask),
            AtCommand::EnableMultiplexing => write!(f, "AT+CIPMUX=1"),
            AtCommand::StartServer { port } => write!(f, "AT+CIPSERVER=1,{}", port),
            AtCommand::Send { target, length } => {
                write!(f, "AT+CIPSEND={},{}", target.as_char(), length)
            }
        }
    }
}

/// Writes commands to the module channel, optionally mirrored to the debug channel.
pub struct CommandSender {
    module: Box<dyn ByteChannel>,
    debug: Box<dyn ByteChannel>,
    mirror: bool,
}

impl CommandSender {
    pub fn new(module: Box<dyn ByteChannel>, debug: Box<dyn ByteChannel>, mirror: bool) -> Self {
        Self {
            module,
            debug,
            mirror,
        }
    }

    /// Module channel, for reading notifications and responses
    pub fn module_mut(&mut self) -> &mut dyn ByteChannel {
        self.module.as_mut()
    }

    pub fn is_mirroring(&self) -> bool {
        self.mirror
    }

    /// Send `command` followed by the line terminator
    pub async fn send_command(&mut self, command: &AtCommand) -> BridgeResult<()> {
        self.send_command_with(command, LINE_TERMINATOR).await
    }

    /// Send `command` followed by an explicit terminator
    pub async fn send_command_with(&mut self, command: &AtCommand, terminator: &[u8]) -> BridgeResult<()> {
        let text = command.to_string();
        debug!(command = %text, "sending AT command");

        let mut line = Vec::with_capacity(text.len() + terminator.len());
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(terminator);
        self.send_raw(&line).await
    }

    /// Send raw bytes to the module (and the mirror)
    pub async fn send_raw(&mut self, data: &[u8]) -> BridgeResult<()> {
        self.module.send_bytes(data).await?;
        if self.mirror {
            self.debug.send_bytes(data).await?;
        }
        Ok(())
    }

    /// Copy one byte to the debug channel when mirroring
    pub async fn mirror_byte(&mut self, byte: u8) -> BridgeResult<()> {
        if self.mirror {
            self.debug.send_byte(byte).await?;
        }
        Ok(())
    }

    /// Write text to the debug channel only
    pub async fn debug_message(&mut self, text: &str) -> BridgeResult<()> {
        self.debug.send_bytes(text.as_bytes()).await
    }

    /// Dump one byte as two uppercase hex digits on the debug channel
    pub async fn debug_hex(&mut self, byte: u8) -> BridgeResult<()> {
        let digits = hex::encode_upper([byte]);
        self.debug.send_bytes(digits.as_bytes()).await?;
        self.debug.send_bytes(b"\n\r\n\r").await
    }
}
