use std::path::PathBuf;

/// One URL scheduled for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub url: String,
}

impl Job {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Result of processing exactly one [`Job`].
///
/// An empty `local_file_name` always pairs with `succeeded == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub url: String,
    pub local_file_name: String,
    pub succeeded: bool,
}

impl DownloadOutcome {
    pub fn success(url: impl Into<String>, local_file_name: impl Into<String>) -> Self {
        let local_file_name = local_file_name.into();
        let succeeded = !local_file_name.is_empty();
        Self {
            url: url.into(),
            local_file_name,
            succeeded,
        }
    }

    pub fn failure(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            local_file_name: String::new(),
            succeeded: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    Fetching,
    Completing,
}

/// Decoded preview image, ready to hand to the widget layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Values the owner hands to the pipeline at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub auto_download: bool,
    pub download_directory: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_download: false,
            download_directory: PathBuf::from("./downloads"),
        }
    }
}
