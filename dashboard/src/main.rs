use std::sync::Arc;

use tracing::{error, info};

use dashboard::clock::SystemClock;
use dashboard::config::Config;
use dashboard::controller::SnapshotController;
use dashboard::poller::Poller;
use dashboard::web;
use feeds::HttpTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_args()?;
    info!("Starting network metrics dashboard");
    info!("Mempool base URL: {}", config.mempool_base_url);
    info!("Gold price URL: {}", config.gold_price_url);
    info!("Poll interval: {}s", config.poll_interval.as_secs());
    info!("Listen address: {}", config.listen_address);

    let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
    let controller = Arc::new(SnapshotController::new(
        transport,
        config.endpoints(),
        Arc::new(SystemClock),
        config.gold_supply_oz,
    ));

    // First cycle fires immediately, then every poll interval
    let poller = Poller::start(controller.clone(), config.poll_interval);

    // A snapshot older than two intervals means polling has fallen over
    let stale_after_secs = config.poll_interval.as_secs() * 2;

    tokio::select! {
        result = web::run_http_server(config.listen_address, controller, stale_after_secs) => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received — shutting down");
        }
    }

    poller.shutdown().await;
    Ok(())
}
