/// chatsync - terminal chat client entry point
use chatsync_core::config::DEFAULT_LOG_FILTER;
use chatsync_core::{cli_app, Config};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they do not interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    info!("Starting chatsync as {}", config.self_id);
    info!("   Store: {}", config.api_url);
    info!("   Transport: {:?}", config.transport_addr);

    cli_app::run(config).await
}
