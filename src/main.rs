//! CLI for subgate
//!
//! Loads configuration, starts the gateway and serves until Ctrl-C.

use clap::Parser;
use subgate::config::{DEFAULT_CONFIG_PATH, load_config_from};
use subgate::transport::{self, AppState};
use subgate::utils::logging;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "subgate", about = "Real-time topic subscription gateway")]
struct Cli {
    /// Configuration file, with or without extension
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run_server(&cli.config).await {
        // logging may not be up yet if the config itself failed
        logging::init("info");
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run_server(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_config_from(config_path)?;
    logging::init(&settings.logging.level);

    let state = AppState::from_settings(&settings)?;
    let listener = TcpListener::bind(settings.server.address()).await?;

    transport::serve(listener, state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    })
    .await?;

    Ok(())
}
