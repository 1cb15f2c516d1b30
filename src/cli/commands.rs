use crate::cli::args::{Args, Command, ConfigCommand, ReplayArgs, RunArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter, PortInfo};
use crate::core::relay::{replay_capture, Bridge};
use crate::domain::config::{BridgeConfig, ConnectionConfig};
use crate::domain::error::{BridgeError, BridgeResult};
use crate::infrastructure::channel::open_channel;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use std::path::Path;
use tracing::{info, warn};

/// Execute CLI command. Failures are reported through the output writer in
/// the selected format before being returned.
pub async fn execute_command(args: Args) -> BridgeResult<()> {
    let writer = ConsoleWriter::new(args.output);
    let result = dispatch(args, &writer).await;
    if let Err(err) = &result {
        writer.write_error(&err.to_string())?;
    }
    result
}

async fn dispatch(args: Args, writer: &ConsoleWriter) -> BridgeResult<()> {
    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    match args.command {
        Command::Run(run_args) => execute_run(run_args, writer, config).await,
        Command::Replay(replay_args) => execute_replay(replay_args, writer, &config).await,
        Command::Ports => execute_ports(writer),
        Command::Config(config_args) => match config_args.command {
            ConfigCommand::Show => {
                writer.write_config(&config)?;
                Ok(())
            }
            ConfigCommand::Init { path } => {
                let created = config_manager.init_project_config(Path::new(&path))?;
                writer.write_message(&format!("Created {}", created.display()))?;
                Ok(())
            }
            ConfigCommand::Path => {
                writer.write_message(&format!(
                    "global: {}",
                    config_manager.get_global_config_path_ref().display()
                ))?;
                match config_manager.get_project_config_path() {
                    Some(path) => writer.write_message(&format!("project: {}", path.display()))?,
                    None => writer.write_message("project: none")?,
                }
                Ok(())
            }
        },
        Command::Version => {
            writer.write_message(&format!("espbridge {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Fold command line overrides into the loaded configuration
pub fn apply_run_overrides(config: &mut BridgeConfig, args: &RunArgs) -> BridgeResult<()> {
    override_serial(&mut config.module, "module", args.module_port.as_deref(), args.module_baud)?;
    override_serial(&mut config.debug, "debug", args.debug_port.as_deref(), args.debug_baud)?;
    if args.no_mirror {
        config.relay.mirror_to_debug = false;
    }
    config.validate()
}

fn override_serial(
    connection: &mut ConnectionConfig,
    name: &str,
    new_port: Option<&str>,
    new_baud: Option<u32>,
) -> BridgeResult<()> {
    if new_port.is_none() && new_baud.is_none() {
        return Ok(());
    }

    match connection {
        ConnectionConfig::Serial { port, baud_rate, .. } => {
            if let Some(new_port) = new_port {
                *port = new_port.to_string();
            }
            if let Some(new_baud) = new_baud {
                *baud_rate = new_baud;
            }
            Ok(())
        }
        ConnectionConfig::Tcp { .. } => Err(BridgeError::InvalidInput(format!(
            "{} channel is configured as TCP; serial overrides do not apply",
            name
        ))),
    }
}

async fn execute_run(args: RunArgs, writer: &ConsoleWriter, mut config: BridgeConfig) -> BridgeResult<()> {
    apply_run_overrides(&mut config, &args)?;

    info!(
        module = %config.module.describe(),
        debug = %config.debug.describe(),
        "opening channels"
    );
    let module = open_channel("module", &config.module).await?;
    let debug = open_channel("debug", &config.debug).await?;

    let mut bridge = Bridge::new(&config, module, debug);
    let result = tokio::select! {
        result = bridge.run() => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping bridge");
            Ok(())
        }
    };

    writer.write_stats(&bridge.stats())?;
    result
}

async fn execute_replay(args: ReplayArgs, writer: &ConsoleWriter, config: &BridgeConfig) -> BridgeResult<()> {
    let capture = std::fs::read(&args.capture).map_err(|e| {
        BridgeError::InvalidInput(format!("Failed to read capture {}: {}", args.capture, e))
    })?;

    let entries = replay_capture(&config.relay, &capture).await?;
    writer.write_replay(&entries, args.format)?;
    Ok(())
}

fn execute_ports(writer: &ConsoleWriter) -> BridgeResult<()> {
    let ports = serialport::available_ports().map_err(|e| BridgeError::Communication {
        message: format!("Failed to list serial ports: {}", e),
    })?;

    let ports: Vec<PortInfo> = ports
        .into_iter()
        .map(|port| PortInfo {
            name: port.port_name,
            kind: match port.port_type {
                serialport::SerialPortType::UsbPort(usb) => format!(
                    "usb {:04x}:{:04x}{}",
                    usb.vid,
                    usb.pid,
                    usb.product.map(|p| format!(" {}", p)).unwrap_or_default()
                ),
                serialport::SerialPortType::PciPort => "pci".to_string(),
                serialport::SerialPortType::BluetoothPort => "bluetooth".to_string(),
                serialport::SerialPortType::Unknown => "unknown".to_string(),
            },
        })
        .collect();

    writer.write_ports(&ports)?;
    Ok(())
}
