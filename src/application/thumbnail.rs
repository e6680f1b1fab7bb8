use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::session::InFlightGuard;
use super::PipelineEvent;
use crate::api::client::decode_thumbnail;
use crate::api::{ImageFetcher, ThumbnailLocator};
use crate::domain::{AppError, DownloadOutcome, ThumbnailImage};
use crate::utils::display_name;

/// Resolves and decodes the preview image for a finished download.
#[derive(Clone)]
pub struct ThumbnailFetcher {
    locator: Arc<dyn ThumbnailLocator>,
    images: Arc<dyn ImageFetcher>,
    edge: u32,
    timeout: Duration,
    events: mpsc::UnboundedSender<PipelineEvent>,
}

impl ThumbnailFetcher {
    pub fn new(
        locator: Arc<dyn ThumbnailLocator>,
        images: Arc<dyn ImageFetcher>,
        edge: u32,
        timeout: Duration,
        events: mpsc::UnboundedSender<PipelineEvent>,
    ) -> Self {
        Self {
            locator,
            images,
            edge,
            timeout,
            events,
        }
    }

    /// Run the thumbnail stage in the background.
    ///
    /// `guard` is dropped after `ThumbnailReady` is sent, whatever happened.
    pub fn spawn(&self, outcome: DownloadOutcome, guard: InFlightGuard) -> JoinHandle<()> {
        let stage = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            stage.complete(outcome).await;
        })
    }

    async fn complete(&self, outcome: DownloadOutcome) {
        let display_name = display_name(&outcome.local_file_name);
        let resolved = tokio::time::timeout(self.timeout, self.resolve(&outcome.url))
            .await
            .unwrap_or_else(|_| {
                Err(AppError::ThumbnailFailure(format!(
                    "gave up after {:?}",
                    self.timeout
                )))
            });
        let image = match resolved {
            Ok(image) => {
                info!("Thumbnail ready for {}", display_name);
                Some(image)
            }
            Err(e) => {
                warn!("{} ({})", e, outcome.url);
                None
            }
        };
        let _ = self.events.send(PipelineEvent::ThumbnailReady {
            display_name,
            image,
        });
    }

    async fn resolve(&self, url: &str) -> Result<ThumbnailImage, AppError> {
        let image_url = self
            .locator
            .thumbnail_url(url)
            .await
            .map_err(|e| AppError::ThumbnailFailure(e.to_string()))?
            .ok_or_else(|| AppError::ThumbnailFailure("no thumbnail listed".to_string()))?;

        let bytes = self
            .images
            .fetch_image(&image_url)
            .await
            .map_err(|e| AppError::ThumbnailFailure(e.to_string()))?;

        let edge = self.edge;
        tokio::task::spawn_blocking(move || decode_thumbnail(&bytes, edge))
            .await
            .map_err(|e| AppError::ThumbnailFailure(e.to_string()))?
            .map_err(|e| AppError::ThumbnailFailure(e.to_string()))
    }
}
