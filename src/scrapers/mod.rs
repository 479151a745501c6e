pub mod error;
pub mod http;
pub mod leboncoin;
pub mod traits;

pub use error::ScrapeError;
pub use http::HttpFetcher;
pub use leboncoin::LeboncoinScraper;
pub use traits::AdSource;
