pub mod filename;

pub use filename::image_file_name;

use crate::scrapers::error::ScrapeError;
use crate::scrapers::http::HttpFetcher;
use futures::future::join_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Downloads ad images into a scratch directory
#[derive(Clone)]
pub struct ImageRetriever {
    fetcher: HttpFetcher,
    dir: PathBuf,
}

impl ImageRetriever {
    pub fn new(fetcher: HttpFetcher, dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            dir: dir.into(),
        }
    }

    /// Download every image concurrently. All or nothing: when one download
    /// fails the files already written are removed and the error returned.
    pub async fn retrieve_all(&self, urls: &[String]) -> Result<Vec<PathBuf>, ScrapeError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let results = join_all(urls.iter().map(|url| self.retrieve(url))).await;

        let mut files = Vec::with_capacity(results.len());
        let mut failure = None;
        for result in results {
            match result {
                Ok(path) => files.push(path),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(_) => {}
            }
        }

        if let Some(e) = failure {
            self.cleanup(&files).await;
            return Err(e);
        }

        info!("Downloaded {} images", files.len());
        Ok(files)
    }

    async fn retrieve(&self, url: &str) -> Result<PathBuf, ScrapeError> {
        debug!("Fetching image {}", url);
        let bytes = self.fetcher.get_bytes(url).await?;
        let path = self.dir.join(image_file_name(url));
        write_or_discard(&path, &bytes).await?;
        Ok(path)
    }

    /// Remove downloaded files; files already gone count as cleaned
    pub async fn cleanup(&self, files: &[PathBuf]) {
        for path in files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Already removed {}", path.display())
                }
                Err(e) => warn!(error = %e, "Could not remove {}", path.display()),
            }
        }
    }
}

/// Write a file, removing whatever was written if the write fails
async fn write_or_discard(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let Err(e) = tokio::fs::write(path, bytes).await else {
        return Ok(());
    };
    match tokio::fs::remove_file(path).await {
        Err(remove) if remove.kind() != ErrorKind::NotFound => {
            warn!(error = %remove, "Could not remove partial file {}", path.display())
        }
        _ => {}
    }
    Err(e)
}
