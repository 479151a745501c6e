use crate::models::Ad;
use crate::scrapers::error::ScrapeError;
use async_trait::async_trait;

/// Common trait for classifieds sources the bridge can scrape
#[async_trait]
pub trait AdSource: Send + Sync {
    /// Fetch a listing page and extract its ad
    async fn extract(&self, url: &str) -> Result<Ad, ScrapeError>;

    /// Whether a chat message mentions this source at all
    fn mentioned_in(&self, text: &str) -> bool;

    /// Get the name of the source
    fn source_name(&self) -> &'static str;
}
