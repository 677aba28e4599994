use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use cdp_gateway::app::ingest_use_case::IngestUseCase;
use cdp_gateway::config::AppConfig;
use cdp_gateway::infra::segment_client::SegmentClient;
use cdp_gateway::{logging, server};

#[derive(Parser)]
#[command(name = "cdp-gateway")]
#[command(about = "Member event gateway for the customer data platform")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to bind (overrides the PORT environment variable)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Arc::new(AppConfig::from_env()?);
            let port = port.unwrap_or(config.port);

            info!(
                allowed_keys = config.api_keys.len(),
                port, "starting gateway"
            );

            let delivery = Arc::new(SegmentClient::new(config.write_key.clone()));
            let ingest = Arc::new(IngestUseCase::new(delivery));
            server::start_server(config, ingest, port).await?;
        }
    }

    Ok(())
}
