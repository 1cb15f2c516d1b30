use crate::cli::args::{DataFormat, OutputFormat};
use crate::core::relay::{RelayStats, ReplayEntry};
use crate::domain::config::BridgeConfig;
use base64::Engine;
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_replay(&self, entries: &[ReplayEntry], format: DataFormat) -> Result<(), OutputError>;
    fn write_stats(&self, stats: &RelayStats) -> Result<(), OutputError>;
    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError>;
    fn write_ports(&self, ports: &[PortInfo]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::BridgeError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Serial port listing entry
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

/// Render payload bytes for display
pub fn format_payload(data: &[u8], format: DataFormat) -> String {
    match format {
        DataFormat::Text => String::from_utf8_lossy(data).escape_debug().to_string(),
        DataFormat::Hex => hex::encode_upper(data),
        DataFormat::Base64 => base64::engine::general_purpose::STANDARD.encode(data),
    }
}

/// Replay entry flattened for JSON and table output
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ReplayRow {
    index: usize,
    status: String,
    source: String,
    target: String,
    length: String,
    payload: String,
}

impl ReplayRow {
    fn new(index: usize, entry: &ReplayEntry, format: DataFormat) -> Self {
        match entry {
            ReplayEntry::Relayed {
                notification,
                record,
                ..
            } => Self {
                index,
                status: if record.truncated { "truncated" } else { "relayed" }.to_string(),
                source: record.source.to_string(),
                target: record.target.to_string(),
                length: record.length.to_string(),
                payload: format_payload(&notification.payload, format),
            },
            ReplayEntry::Dropped { error } => Self {
                index,
                status: "dropped".to_string(),
                source: "-".to_string(),
                target: "-".to_string(),
                length: "-".to_string(),
                payload: error.clone(),
            },
        }
    }
}

/// Table row for relay counters
#[derive(Tabled)]
struct StatsTableRow {
    relayed: u64,
    dropped: u64,
    truncated: u64,
    noise_bytes: u64,
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_replay(&self, entries: &[ReplayEntry], format: DataFormat) -> Result<(), OutputError> {
        let rows: Vec<ReplayRow> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| ReplayRow::new(index, entry, format))
            .collect();

        match self.format {
            OutputFormat::Text => {
                for (row, entry) in rows.iter().zip(entries) {
                    match entry {
                        ReplayEntry::Relayed { output, .. } => {
                            println!("#{} {} {} -> {} ({} bytes)", row.index, row.status, row.source, row.target, row.length);
                            println!("  payload: {}", row.payload);
                            println!("  module:  {}", format_payload(output, format));
                        }
                        ReplayEntry::Dropped { error } => {
                            println!("#{} dropped: {}", row.index, error);
                        }
                    }
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Table => {
                if !rows.is_empty() {
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_stats(&self, stats: &RelayStats) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Relay statistics:");
                println!("  Relayed: {}", stats.relayed);
                println!("  Dropped: {}", stats.dropped);
                println!("  Truncated: {}", stats.truncated);
                println!("  Noise bytes: {}", stats.noise_bytes);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(stats)?);
            }
            OutputFormat::Table => {
                let row = StatsTableRow {
                    relayed: stats.relayed,
                    dropped: stats.dropped,
                    truncated: stats.truncated,
                    noise_bytes: stats.noise_bytes,
                };
                println!("{}", Table::new(vec![row]));
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text | OutputFormat::Table => {
                print!("{}", toml::to_string_pretty(config)?);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
        }
        Ok(())
    }

    fn write_ports(&self, ports: &[PortInfo]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Available serial ports:");
                for port in ports {
                    println!("  {} ({})", port.name, port.kind);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(ports)?);
            }
            OutputFormat::Table => {
                if !ports.is_empty() {
                    println!("{}", Table::new(ports.to_vec()));
                }
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "message": message }));
            }
            _ => println!("{}", message),
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({ "error": error }));
            }
            _ => eprintln!("Error: {}", error),
        }
        Ok(())
    }
}
