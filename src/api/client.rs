use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::ImageFetcher;
use crate::domain::ThumbnailImage;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yt-dlp is not installed (tried: {0})")]
    ToolMissing(String),

    #[error("{program} failed (code={code:?}): {stderr}")]
    ToolFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("yt-dlp did not report an output file")]
    NoOutputFile,

    #[error("Timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Plain HTTP client for preview images.
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
}

impl ImageClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for ImageClient {
    async fn fetch_image(&self, image_url: &str) -> Result<bytes::Bytes> {
        let url = Url::parse(image_url)?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }
}

/// Decode `bytes` and shrink the result so its longest edge is at most `edge`.
///
/// CPU bound; callers run it on the blocking pool.
pub fn decode_thumbnail(bytes: &[u8], edge: u32) -> Result<ThumbnailImage> {
    let decoded = image::load_from_memory(bytes)?;
    let resized = if decoded.width() > edge || decoded.height() > edge {
        decoded.thumbnail(edge, edge)
    } else {
        decoded
    };
    let rgba = resized.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ThumbnailImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}
