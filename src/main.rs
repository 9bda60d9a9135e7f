use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use restock_sentinel::config::AppConfig;
use restock_sentinel::fetcher::HttpFetcher;
use restock_sentinel::notifier::TelegramNotifier;
use restock_sentinel::supervisor::Supervisor;
use restock_sentinel::targets;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("restock_sentinel=info".parse()?),
        )
        .init();

    info!("Starting Restock Sentinel...");

    // Fails fast: missing Telegram credentials are fatal at startup
    let config = AppConfig::from_env()?;
    let registry = targets::builtin_targets()?;
    info!("Watching {} targets", registry.len());

    let fetcher = Arc::new(HttpFetcher::new(&config.poller)?);
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram));

    let supervisor = Supervisor::new(registry, fetcher, notifier, &config);
    supervisor.run().await; // runs until externally killed

    Ok(())
}
