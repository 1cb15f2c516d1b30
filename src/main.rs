// ESPBridge - ESP8266 two-client relay bridge
use clap::Parser;
use espbridge::cli::args::Args;
use espbridge::cli::commands::execute_command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if execute_command(args).await.is_err() {
        // Already reported by the output writer
        std::process::exit(1);
    }
    Ok(())
}
