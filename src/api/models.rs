use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Subset of the `yt-dlp --dump-single-json` document the pipeline reads.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Configuration for the external media tools
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Tried in order; a candidate whose program is missing is skipped.
    pub program_candidates: Vec<(String, Vec<String>)>,
    pub format: String,
    pub container: String,
    pub metadata_timeout: Duration,
    pub image_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            program_candidates: vec![
                ("yt-dlp".to_string(), Vec::new()),
                (
                    "python3".to_string(),
                    vec!["-m".to_string(), "yt_dlp".to_string()],
                ),
                (
                    "python".to_string(),
                    vec!["-m".to_string(), "yt_dlp".to_string()],
                ),
            ],
            format: "bestvideo+bestaudio/best".to_string(),
            container: "mp4".to_string(),
            metadata_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(15),
        }
    }
}
