use crate::domain::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest payload the module accepts in one `AT+CIPSEND`
pub const MAX_PAYLOAD_CAPACITY: usize = 2048;

/// ESPBridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Channel wired to the Wi-Fi module
    #[serde(default = "default_module_connection")]
    pub module: ConnectionConfig,
    /// Debug/echo channel
    #[serde(default = "default_debug_connection")]
    pub debug: ConnectionConfig,
    /// Wireless network the module creates
    #[serde(default)]
    pub access_point: AccessPointConfig,
    /// Static addressing of the module
    #[serde(default)]
    pub network: NetworkConfig,
    /// Listening server on the module
    #[serde(default)]
    pub server: ServerConfig,
    /// Notification relay behaviour
    #[serde(default)]
    pub relay: RelayConfig,
    /// Bring-up timing and quirks
    #[serde(default)]
    pub bringup: BringUpConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ConnectionConfig {
    #[serde(rename = "serial")]
    Serial {
        port: String,
        baud_rate: u32,
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
        #[serde(default = "default_parity")]
        parity: ParityConfig,
        #[serde(default = "default_flow_control")]
        flow_control: FlowControlConfig,
    },
    /// Serial line exposed through a TCP bridge such as ser2net
    #[serde(rename = "tcp")]
    Tcp {
        host: String,
        port: u16,
        #[serde(default = "default_tcp_timeout")]
        timeout_ms: u64,
    },
}

/// Parity configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    None,
    Hardware,
    Software,
}

/// Soft access point settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessPointConfig {
    #[serde(default = "default_ssid")]
    pub ssid: String,
    #[serde(default = "default_passphrase")]
    pub passphrase: String,
    #[serde(default = "default_wifi_channel")]
    pub channel: u8,
    #[serde(default = "default_encryption")]
    pub encryption: Encryption,
}

/// Access point security mode, numbered as the module expects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    Open,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
}

impl Encryption {
    pub fn code(self) -> u8 {
        match self {
            Encryption::Open => 0,
            Encryption::WpaPsk => 2,
            Encryption::Wpa2Psk => 3,
            Encryption::WpaWpa2Psk => 4,
        }
    }
}

/// Static address assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_gateway")]
    pub gateway: String,
    #[serde(default = "default_netmask")]
    pub netmask: String,
}

/// Listening server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
}

/// Notification relay settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Payload buffer capacity in bytes
    #[serde(default = "default_payload_capacity")]
    pub payload_capacity: usize,
    /// Copy every outbound module command to the debug channel
    #[serde(default = "default_mirror")]
    pub mirror_to_debug: bool,
    /// Longest wait for the next byte of an in-progress notification
    #[serde(default = "default_byte_timeout")]
    pub byte_timeout_ms: u64,
    /// Pause between polls while waiting for a byte
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Bring-up settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BringUpConfig {
    /// Wait for each acknowledgement byte of the liveness probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// Pause between successful bring-up and serving
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
    /// Pause before halting after a failed bring-up
    #[serde(default = "default_halt_delay")]
    pub halt_delay_ms: u64,
    /// Terminate the access point command with a single space instead of the line terminator
    #[serde(default)]
    pub legacy_access_point_terminator: bool,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_module_connection() -> ConnectionConfig {
    ConnectionConfig::Serial {
        port: "/dev/ttyUSB0".to_string(),
        baud_rate: 115_200,
        data_bits: default_data_bits(),
        stop_bits: default_stop_bits(),
        parity: default_parity(),
        flow_control: default_flow_control(),
    }
}

fn default_debug_connection() -> ConnectionConfig {
    ConnectionConfig::Serial {
        port: "/dev/ttyUSB1".to_string(),
        baud_rate: 19_200,
        data_bits: default_data_bits(),
        stop_bits: default_stop_bits(),
        parity: default_parity(),
        flow_control: default_flow_control(),
    }
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> ParityConfig {
    ParityConfig::None
}

fn default_flow_control() -> FlowControlConfig {
    FlowControlConfig::None
}

fn default_tcp_timeout() -> u64 {
    3000
}

fn default_ssid() -> String {
    "espTobi_Wild".to_string()
}

fn default_passphrase() -> String {
    "1234".to_string()
}

fn default_wifi_channel() -> u8 {
    5
}

fn default_encryption() -> Encryption {
    Encryption::Wpa2Psk
}

fn default_ip() -> String {
    "172.168.1.100".to_string()
}

fn default_gateway() -> String {
    "172.168.1.1".to_string()
}

fn default_netmask() -> String {
    "255.255.255.0".to_string()
}

fn default_server_port() -> u16 {
    23
}

fn default_payload_capacity() -> usize {
    100
}

fn default_mirror() -> bool {
    true
}

fn default_byte_timeout() -> u64 {
    500
}

fn default_poll_interval() -> u64 {
    1
}

fn default_probe_timeout() -> u64 {
    1000
}

fn default_settle() -> u64 {
    100
}

fn default_halt_delay() -> u64 {
    10_000
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            module: default_module_connection(),
            debug: default_debug_connection(),
            access_point: AccessPointConfig::default(),
            network: NetworkConfig::default(),
            server: ServerConfig::default(),
            relay: RelayConfig::default(),
            bringup: BringUpConfig::default(),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: default_ssid(),
            passphrase: default_passphrase(),
            channel: default_wifi_channel(),
            encryption: default_encryption(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            gateway: default_gateway(),
            netmask: default_netmask(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            payload_capacity: default_payload_capacity(),
            mirror_to_debug: default_mirror(),
            byte_timeout_ms: default_byte_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout(),
            settle_ms: default_settle(),
            halt_delay_ms: default_halt_delay(),
            legacy_access_point_terminator: false,
        }
    }
}

impl RelayConfig {
    pub fn byte_timeout(&self) -> Duration {
        Duration::from_millis(self.byte_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl BringUpConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn halt_delay(&self) -> Duration {
        Duration::from_millis(self.halt_delay_ms)
    }
}

impl ConnectionConfig {
    /// Short human-readable description of the endpoint
    pub fn describe(&self) -> String {
        match self {
            ConnectionConfig::Serial {
                port, baud_rate, ..
            } => format!("serial {}@{}", port, baud_rate),
            ConnectionConfig::Tcp { host, port, .. } => format!("tcp {}:{}", host, port),
        }
    }
}

impl BridgeConfig {
    /// Check value ranges the module or the relay cannot work with
    pub fn validate(&self) -> BridgeResult<()> {
        let invalid = |message: String| Err(BridgeError::Config { message });

        if self.access_point.ssid.is_empty() {
            return invalid("access point ssid must not be empty".to_string());
        }
        if self.access_point.passphrase.len() > 64 {
            return invalid("access point passphrase exceeds 64 bytes".to_string());
        }
        if !(1..=13).contains(&self.access_point.channel) {
            return invalid(format!(
                "wifi channel {} outside 1..=13",
                self.access_point.channel
            ));
        }
        if self.server.port == 0 {
            return invalid("server port must not be 0".to_string());
        }
        if self.relay.payload_capacity == 0 || self.relay.payload_capacity > MAX_PAYLOAD_CAPACITY {
            return invalid(format!(
                "payload capacity {} outside 1..={}",
                self.relay.payload_capacity, MAX_PAYLOAD_CAPACITY
            ));
        }
        if self.relay.poll_interval_ms == 0 {
            return invalid("poll interval must be at least 1ms".to_string());
        }
        for (name, connection) in [("module", &self.module), ("debug", &self.debug)] {
            if let ConnectionConfig::Serial { baud_rate: 0, .. } = connection {
                return invalid(format!("{} channel baud rate must not be 0", name));
            }
        }
        Ok(())
    }
}
