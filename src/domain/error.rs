use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Not a fetchable URL: {0}")]
    InvalidUrl(String),

    #[error("Download failed: {0}")]
    FetchFailure(String),

    #[error("Thumbnail unavailable: {0}")]
    ThumbnailFailure(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Settings error: {0}")]
    Settings(String),
}
