use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

use charla::core::config;
use charla::tui;

#[derive(Parser)]
#[command(name = "charla", about = "Terminal chat client")]
struct Args {
    /// Backend base URL (overrides config and CHARLA_BACKEND_URL)
    #[arg(long)]
    backend: Option<String>,
    /// Relay WebSocket URL (overrides config and CHARLA_RELAY_URL)
    #[arg(long)]
    relay: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // File logger - the terminal itself belongs to the TUI
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("charla.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().map_err(std::io::Error::other)?;
    let resolved = config::resolve(&file_config, args.backend.as_deref(), args.relay.as_deref());
    log::info!(
        "Charla starting: backend={} relay={}",
        resolved.backend_url,
        resolved.relay_url
    );

    tui::run(resolved)
}
