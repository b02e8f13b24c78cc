/// eob-bridge entry point
///
/// Without a subcommand this starts the webhook server on the configured address
/// (127.0.0.1:8000 by default), exposing POST /monday/webhook/export-eob.

use clap::Parser;
use eob_bridge::{cli::Cli, config::Config, server::init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Loads .env before the log filter reads RUST_LOG
    let config = Config::from_env();
    init_tracing();

    cli.run(config).await?;

    Ok(())
}
