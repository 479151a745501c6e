pub mod discord;

use crate::card::{CardFormatter, FormattedCard};
use crate::routing::RouteEnricher;
use crate::scrapers::{AdSource, ScrapeError};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Any URL-shaped substring. Not anchored to the listing domain: once a
/// message mentions the site, every URL in it is a candidate.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:(?:https?|ftp|file)://|www\.|ftp\.)(?:\([-A-Z0-9+&@#/%=~_|$?!:,.]*\)|[-A-Z0-9+&@#/%=~_|$?!:,.])*(?:\([-A-Z0-9+&@#/%=~_|$?!:,.]*\)|[A-Z0-9+&@#/%=~_|$])",
    )
    .unwrap()
});

/// A chat message as seen by the bridge
#[derive(Debug, Clone, Copy)]
pub struct InboundMessage<'a> {
    pub content: &'a str,
    pub from_bot: bool,
}

/// Where replies for one inbound message go
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn post(&self, reply: &FormattedCard) -> Result<()>;
}

/// Connects inbound messages to the scrape, format and post pipeline
pub struct Bridge {
    source: Arc<dyn AdSource>,
    formatter: CardFormatter,
    routes: RouteEnricher,
}

impl Bridge {
    pub fn new(source: Arc<dyn AdSource>, formatter: CardFormatter, routes: RouteEnricher) -> Self {
        Self {
            source,
            formatter,
            routes,
        }
    }

    /// URLs worth scraping in a message, in order of appearance
    pub fn candidate_urls(&self, text: &str) -> Vec<String> {
        if !self.source.mentioned_in(text) {
            return Vec::new();
        }
        URL_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Handle one message: every candidate URL is scraped concurrently, then
    /// replies are posted in match order. A failing URL is logged and
    /// skipped. Returns the number of replies delivered.
    pub async fn handle_message(&self, message: InboundMessage<'_>, sink: &dyn ReplySink) -> usize {
        if message.from_bot {
            return 0;
        }
        let urls = self.candidate_urls(message.content);
        if urls.is_empty() {
            return 0;
        }
        info!(
            "Found {} candidate {} URLs",
            urls.len(),
            self.source.source_name()
        );

        let results = join_all(urls.iter().map(|url| self.run_pipeline(url))).await;

        let mut delivered = 0;
        for (url, result) in urls.iter().zip(results) {
            let reply = match result {
                Ok(reply) => reply,
                Err(e) if e.is_extraction() => {
                    warn!(url = %url, error = %e, "Page has no usable ad data, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Skipping ad");
                    continue;
                }
            };

            match sink.post(&reply).await {
                Ok(()) => {
                    debug!(url = %url, "Reply posted");
                    delivered += 1;
                }
                Err(e) => error!(url = %url, error = %e, "Could not post reply"),
            }
            self.formatter.images().cleanup(&reply.files).await;
        }
        delivered
    }

    async fn run_pipeline(&self, url: &str) -> Result<FormattedCard, ScrapeError> {
        let ad = self.source.extract(url).await?;
        let route = self.routes.estimate_travel_time(&ad).await;
        self.formatter.format(&ad, route.as_ref()).await
    }
}
