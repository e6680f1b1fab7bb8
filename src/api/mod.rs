//! External capabilities: media fetch, thumbnail lookup, image retrieval.

pub mod client;
pub mod models;
pub mod ytdlp;

use async_trait::async_trait;
use std::path::Path;

pub use client::{ApiError, ImageClient, Result};
pub use models::FetcherConfig;
pub use ytdlp::YtDlp;

/// Receives raw byte counters while a fetch is running.
///
/// `total == 0` means the size is not known yet.
pub trait ProgressSink: Send + Sync {
    fn report(&self, downloaded: u64, total: u64);
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` into `directory` and return the local file name.
    async fn fetch(
        &self,
        url: &str,
        directory: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<String>;
}

#[async_trait]
pub trait ThumbnailLocator: Send + Sync {
    /// Preview image URL for `url`, `None` when the source has none.
    async fn thumbnail_url(&self, url: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, image_url: &str) -> Result<bytes::Bytes>;
}
