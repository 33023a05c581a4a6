use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;

use bridge_hub::app::build_router;
use bridge_hub::config::HubConfig;
use bridge_hub::hub::{spawn_pruner, Hub};

/// Fraud intelligence hub: ingests risk fingerprints, correlates them
/// into behavioral patterns, and surfaces advisories.
#[derive(Debug, Parser)]
struct Cli {
    /// Path to a .env file to load before reading the environment.
    #[arg(long, env = "HUB_ENV_FILE")]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            dotenv::from_filename(path).ok();
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = HubConfig::from_env();
    config.validate()?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder");

    let hub = Arc::new(Hub::new(config));
    let pruner = spawn_pruner(Arc::clone(&hub));
    let app = build_router(hub, prometheus_handle);

    tracing::info!(%addr, "bridge hub listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    pruner.abort();
    Ok(())
}
