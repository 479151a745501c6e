mod bridge;
mod card;
mod config;
mod images;
mod models;
mod routing;
mod scrapers;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use bridge::discord::DiscordBridge;
use bridge::Bridge;
use card::CardFormatter;
use config::Config;
use images::ImageRetriever;
use routing::RouteEnricher;
use scrapers::{HttpFetcher, LeboncoinScraper};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Leboncoin Scout - Discord ad previews");

    let config = Config::from_env()?;
    if config.routing.api_key.is_none() {
        info!("No ROUTING_API_KEY, travel times will show as N/A");
    }

    let fetcher = HttpFetcher::new(config.http_timeout)?;
    let mut scraper = LeboncoinScraper::new(fetcher.clone());
    if let Some(path) = &config.debug_dump {
        scraper = scraper.with_debug_dump(path.clone());
    }

    let bridge = Arc::new(Bridge::new(
        Arc::new(scraper),
        CardFormatter::new(ImageRetriever::new(fetcher, &config.images_dir)),
        RouteEnricher::new(config.routing.clone())?,
    ));

    let mut discord =
        DiscordBridge::connect(&config.discord_token, config.discord_client_id, bridge).await?;

    let shard_manager = discord.shard_manager();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Could not listen for shutdown signal");
            return;
        }
        DiscordBridge::stop(&shard_manager).await;
    });

    discord.start().await
}
