use thiserror::Error;

/// Failures of the fetch and extraction pipeline for a single ad
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error {status} for {url}")]
    Http { status: u16, url: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The page has no embedded data payload (ad removed, redesign, bot wall)
    #[error("no embedded ad data found in {url}")]
    MissingPayload { url: String },

    #[error("embedded ad data is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("missing field `{path}` in ad data")]
    MissingField { path: String },

    #[error("invalid field `{path}` in ad data: {reason}")]
    InvalidField { path: String, reason: String },

    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// True when the page was fetched but its content had the wrong shape
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            Self::MissingPayload { .. } | Self::MissingField { .. } | Self::InvalidField { .. }
        )
    }
}
