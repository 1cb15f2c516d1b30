use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for ESPBridge
#[derive(Parser, Debug)]
#[command(
    name = "espbridge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Two-client relay bridge for ESP8266 Wi-Fi modules",
    long_about = "Configures an ESP8266 module as an access point with a listening server and relays every message one connected client sends to the other client, mirroring module traffic to a debug channel."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring up the module and relay messages between its two clients
    Run(RunArgs),
    /// Parse a captured module stream offline and show what would be relayed
    Replay(ReplayArgs),
    /// List available serial ports
    Ports,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Channel overrides for the run command
#[derive(ClapArgs, Debug, Default)]
pub struct RunArgs {
    /// Serial port wired to the module
    #[arg(long)]
    pub module_port: Option<String>,

    /// Module baud rate
    #[arg(long)]
    pub module_baud: Option<u32>,

    /// Serial port of the debug terminal
    #[arg(long)]
    pub debug_port: Option<String>,

    /// Debug baud rate
    #[arg(long)]
    pub debug_baud: Option<u32>,

    /// Do not copy module traffic to the debug channel
    #[arg(long)]
    pub no_mirror: bool,
}

/// Replay arguments
#[derive(ClapArgs, Debug)]
pub struct ReplayArgs {
    /// File holding raw bytes captured from the module channel
    pub capture: String,

    /// Payload rendering
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: DataFormat,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Write a default project configuration
    Init {
        /// Directory to create .espbridge/config.toml in
        #[arg(default_value = ".")]
        path: String,
    },
    /// Show where configuration files are looked up
    Path,
}

/// Payload data format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Text,
    Hex,
    Base64,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Text => write!(f, "text"),
            DataFormat::Hex => write!(f, "hex"),
            DataFormat::Base64 => write!(f, "base64"),
        }
    }
}
