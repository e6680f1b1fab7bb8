use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use super::models::{FetcherConfig, VideoInfo};
use super::{ApiError, MediaFetcher, ProgressSink, Result, ThumbnailLocator};
use crate::utils::normalize_container;

const PROGRESS_MARKER: &str = "clipfetch-progress";

static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^clipfetch-progress (\d+|NA)(?:\.\d+)?/(\d+|NA)(?:\.\d+)?\s*$")
        .expect("progress pattern is valid")
});

/// Parse one of our `--progress-template` lines into `(downloaded, total)`.
///
/// `NA` fields become 0, which downstream treats as unknown.
pub fn parse_progress_line(line: &str) -> Option<(u64, u64)> {
    let caps = PROGRESS_LINE.captures(line.trim())?;
    let field = |i: usize| caps[i].parse::<u64>().unwrap_or(0);
    Some((field(1), field(2)))
}

/// Decode one raw output line. Titles may arrive in the console code page
/// rather than UTF-8, so invalid bytes are replaced instead of rejected.
fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Drives the `yt-dlp` executable for both downloads and metadata lookups.
#[derive(Debug, Clone)]
pub struct YtDlp {
    config: FetcherConfig,
}

impl YtDlp {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Spawn the first available candidate with `args`.
    fn spawn(&self, args: &[String]) -> Result<(String, Child)> {
        let mut tried = Vec::new();
        for (program, prefix) in &self.config.program_candidates {
            let mut cmd = Command::new(program);
            cmd.args(prefix)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            match cmd.spawn() {
                Ok(child) => return Ok((program.clone(), child)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{} not found, trying next candidate", program);
                    tried.push(program.clone());
                }
                Err(e) => return Err(ApiError::Io(e)),
            }
        }
        Err(ApiError::ToolMissing(tried.join(", ")))
    }

    fn download_args(&self, url: &str, directory: &Path) -> Vec<String> {
        let template = directory.join("%(title)s.%(ext)s");
        vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{} %(progress.downloaded_bytes|NA)s/%(progress.total_bytes,progress.total_bytes_estimate|NA)s",
                PROGRESS_MARKER
            ),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-f".to_string(),
            self.config.format.clone(),
            "--merge-output-format".to_string(),
            self.config.container.clone(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl MediaFetcher for YtDlp {
    async fn fetch(
        &self,
        url: &str,
        directory: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<String> {
        tokio::fs::create_dir_all(directory).await?;

        let (program, mut child) = self.spawn(&self.download_args(url, directory))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ApiError::InvalidResponse("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ApiError::InvalidResponse("stderr not captured".to_string()))?;

        let mut out_lines = BufReader::new(stdout).split(b'\n');
        let mut err_lines = BufReader::new(stderr).split(b'\n');
        let mut out_open = true;
        let mut err_open = true;
        let mut last_path: Option<String> = None;
        let mut err_tail: Vec<String> = Vec::new();

        // Progress can land on either stream depending on verbosity flags.
        while out_open || err_open {
            tokio::select! {
                line = out_lines.next_segment(), if out_open => match line? {
                    Some(raw) => {
                        let line = decode_line(&raw);
                        if let Some((downloaded, total)) = parse_progress_line(&line) {
                            sink.report(downloaded, total);
                        } else if !line.trim().is_empty() {
                            last_path = Some(line.trim().to_string());
                        }
                    }
                    None => out_open = false,
                },
                line = err_lines.next_segment(), if err_open => match line? {
                    Some(raw) => {
                        let line = decode_line(&raw);
                        if let Some((downloaded, total)) = parse_progress_line(&line) {
                            sink.report(downloaded, total);
                        } else if !line.trim().is_empty() {
                            err_tail.push(line);
                            if err_tail.len() > 8 {
                                err_tail.remove(0);
                            }
                        }
                    }
                    None => err_open = false,
                },
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(ApiError::ToolFailed {
                program,
                code: status.code(),
                stderr: if err_tail.is_empty() {
                    "unknown error".to_string()
                } else {
                    err_tail.join(" | ")
                },
            });
        }

        let path = last_path.map(PathBuf::from).ok_or(ApiError::NoOutputFile)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(ApiError::NoOutputFile)?;
        Ok(normalize_container(&file_name, &self.config.container))
    }
}

#[async_trait]
impl ThumbnailLocator for YtDlp {
    async fn thumbnail_url(&self, url: &str) -> Result<Option<String>> {
        let args = vec![
            "--skip-download".to_string(),
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            url.to_string(),
        ];
        let (program, child) = self.spawn(&args)?;
        let limit = self.config.metadata_timeout;
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| ApiError::TimedOut(limit))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ApiError::ToolFailed {
                program,
                code: output.status.code(),
                stderr,
            });
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;
        if info.thumbnail.is_none() {
            warn!(
                "No thumbnail listed for {}",
                info.title.as_deref().unwrap_or(url)
            );
        }
        Ok(info.thumbnail.filter(|thumb| !thumb.is_empty()))
    }
}
