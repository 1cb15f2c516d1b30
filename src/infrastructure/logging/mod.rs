// Logging module - Logging infrastructure
use crate::domain::error::{BridgeError, BridgeResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

/// Default filter directive for a configured level
pub fn default_directive(level: &str, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        match level {
            "error" | "warn" | "info" | "debug" | "trace" => level,
            _ => "info",
        }
    };
    format!("espbridge={},warn", level)
}

/// Initialize logging system. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str, verbose: bool) -> BridgeResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(verbose)
                .with_line_number(verbose)
        )
        .try_init()
        .map_err(|e| BridgeError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("ESPBridge logging system initialized");
    Ok(())
}
