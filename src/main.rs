//! bedrock-idler: an idle bot for Bedrock servers

use bedrock_idler::bot::SHUTDOWN_GRACE;
use bedrock_idler::{Cli, Controller, RelayClient, default_relay_path};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("bedrock_idler=debug")
    } else {
        EnvFilter::new("bedrock_idler=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let relay_path = cli.relay.clone().unwrap_or_else(default_relay_path);
    info!("Starting bot (relay at {})", relay_path.display());

    let (controller, handle) = Controller::new(RelayClient::new(relay_path), cli.bot_config());
    let mut bot = tokio::spawn(controller.run());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
        }
        result = &mut bot => {
            result?;
            return Err("controller stopped unexpectedly".into());
        }
    }

    info!("Shutting down bot...");
    handle.shutdown();
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    bot.abort();
    Ok(())
}
