pub mod clipboard_monitor;
pub mod download_worker;
pub mod job_queue;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod thumbnail;

use crate::domain::{DownloadOutcome, ThumbnailImage};

pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle};

/// Everything the pipeline tells the UI, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    ClipboardChanged(String),
    Enqueued(String),
    FetchStarted(String),
    /// Smoothed display value, 0 to 100.
    ProgressChanged(u8),
    DownloadFinished(DownloadOutcome),
    ThumbnailReady {
        display_name: String,
        image: Option<ThumbnailImage>,
    },
}
