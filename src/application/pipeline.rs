//! Wiring between the clipboard, the queue, the worker and the UI.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, info};
use tokio::sync::mpsc;

use super::clipboard_monitor::{ArboardClipboard, ClipboardMonitor, ClipboardSource};
use super::download_worker::DownloadWorker;
use super::job_queue::JobQueue;
use super::progress::{progress_channel, ProgressReporter, ProgressState, ProgressTracker};
use super::session::SessionState;
use super::thumbnail::ThumbnailFetcher;
use super::PipelineEvent;
use crate::api::{ImageFetcher, MediaFetcher, ThumbnailLocator};
use crate::domain::{AppError, SessionConfig, WorkerPhase};
use crate::utils::is_url;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub clipboard_interval: Duration,
    pub clipboard_read_timeout: Duration,
    pub progress_tick: Duration,
    pub thumbnail_edge: u32,
    /// Upper bound on the whole thumbnail stage, lookup to decode.
    pub thumbnail_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clipboard_interval: Duration::from_millis(500),
            clipboard_read_timeout: Duration::from_millis(200),
            progress_tick: Duration::from_millis(10),
            thumbnail_edge: 160,
            thumbnail_timeout: Duration::from_secs(60),
        }
    }
}

/// The producer side: validation and enqueueing, shared with the clipboard thread.
#[derive(Clone)]
struct Intake {
    queue: Arc<JobQueue>,
    session: Arc<SessionState>,
    events: mpsc::UnboundedSender<PipelineEvent>,
}

impl Intake {
    fn enqueue(&self, url: &str) -> Result<(), AppError> {
        if !is_url(url) {
            return Err(AppError::InvalidUrl(url.to_string()));
        }
        // Announce before the worker can see the job, so Enqueued precedes FetchStarted.
        let _ = self.events.send(PipelineEvent::Enqueued(url.to_string()));
        self.queue.push(url);
        info!("Queued {} ({} pending)", url, self.queue.len());
        Ok(())
    }

    fn on_clipboard_change(&self, text: String) {
        self.session.set_last_clipboard_text(&text);
        let _ = self.events.send(PipelineEvent::ClipboardChanged(text.clone()));
        if !self.session.auto_download() {
            return;
        }
        if let Err(e) = self.enqueue(&text) {
            debug!("Clipboard change ignored: {}", e);
        }
    }
}

/// Cloneable command surface for the UI.
#[derive(Clone)]
pub struct PipelineHandle {
    intake: Intake,
    progress: ProgressTracker,
    monitor: Arc<Mutex<Option<ClipboardMonitor>>>,
    clipboard_interval: Duration,
    clipboard_read_timeout: Duration,
}

impl PipelineHandle {
    /// Queue `url` for download. Anything but an http(s) URL is refused.
    pub fn enqueue(&self, url: &str) -> Result<(), AppError> {
        self.intake.enqueue(url)
    }

    pub fn set_auto_download(&self, enabled: bool) {
        info!("Auto-download {}", if enabled { "on" } else { "off" });
        self.intake.session.set_auto_download(enabled);
    }

    pub fn auto_download(&self) -> bool {
        self.intake.session.auto_download()
    }

    pub fn set_download_directory(&self, directory: PathBuf) {
        info!("Download directory set to {}", directory.display());
        self.intake.session.set_download_directory(directory);
    }

    pub fn download_directory(&self) -> PathBuf {
        self.intake.session.download_directory()
    }

    pub fn is_downloading(&self) -> bool {
        self.intake.session.is_downloading()
    }

    pub fn phase(&self) -> WorkerPhase {
        self.intake.session.phase()
    }

    pub fn last_clipboard_text(&self) -> String {
        self.intake.session.last_clipboard_text()
    }

    pub fn pending_jobs(&self) -> usize {
        self.intake.queue.len()
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.snapshot()
    }

    /// Start or stop watching the system clipboard.
    pub fn set_clipboard_watch(&self, enabled: bool) -> Result<(), AppError> {
        if enabled {
            self.watch_clipboard_with(ArboardClipboard::default)
        } else {
            self.stop_clipboard_watch();
            Ok(())
        }
    }

    /// Watch a specific clipboard source. No-op if a monitor is already running.
    pub fn watch_clipboard_with<S, F>(&self, make_source: F) -> Result<(), AppError>
    where
        S: ClipboardSource,
        F: FnOnce() -> S + Send + 'static,
    {
        let mut slot = self.monitor.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_some() {
            return Ok(());
        }
        let intake = self.intake.clone();
        let monitor = ClipboardMonitor::spawn(
            make_source,
            self.clipboard_interval,
            self.clipboard_read_timeout,
            move |text| intake.on_clipboard_change(text),
        )
        .map_err(|e| AppError::Io(format!("Failed to start clipboard monitor: {}", e)))?;
        *slot = Some(monitor);
        Ok(())
    }

    pub fn stop_clipboard_watch(&self) {
        let monitor = self.monitor.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(monitor) = monitor {
            monitor.stop();
        }
    }

    pub fn is_watching_clipboard(&self) -> bool {
        self.monitor.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }
}

/// A pipeline that has been built but whose tasks are not running yet.
pub struct Pipeline {
    handle: PipelineHandle,
    worker: DownloadWorker,
    reporter: ProgressReporter,
    progress_tick: Duration,
    events_rx: mpsc::UnboundedReceiver<PipelineEvent>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        session: SessionConfig,
        fetcher: Arc<dyn MediaFetcher>,
        locator: Arc<dyn ThumbnailLocator>,
        images: Arc<dyn ImageFetcher>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let queue = Arc::new(JobQueue::new());
        let session = Arc::new(SessionState::new(session));
        let (tracker, reporter) = progress_channel();

        let thumbnails = ThumbnailFetcher::new(
            locator,
            images,
            config.thumbnail_edge,
            config.thumbnail_timeout,
            events_tx.clone(),
        );
        let worker = DownloadWorker::new(
            Arc::clone(&queue),
            Arc::clone(&session),
            fetcher,
            thumbnails,
            tracker.clone(),
            events_tx.clone(),
        );

        let handle = PipelineHandle {
            intake: Intake {
                queue,
                session,
                events: events_tx,
            },
            progress: tracker,
            monitor: Arc::new(Mutex::new(None)),
            clipboard_interval: config.clipboard_interval,
            clipboard_read_timeout: config.clipboard_read_timeout,
        };

        Self {
            handle,
            worker,
            reporter,
            progress_tick: config.progress_tick,
            events_rx,
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Spawn the worker and the progress reporter on the current tokio runtime.
    pub fn start(self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let events = self.handle.intake.events.clone();
        tokio::spawn(self.reporter.run(self.progress_tick, events));
        tokio::spawn(self.worker.run());
        info!("Download pipeline started");
        self.events_rx
    }

    /// Event stream that starts the pipeline on first poll.
    ///
    /// Lets the pipeline be built outside the runtime and started by whatever
    /// executor first drives the stream.
    pub fn into_events(self) -> BoxStream<'static, PipelineEvent> {
        stream::unfold(EventsState::Pending(self), |state| async move {
            let mut rx = match state {
                EventsState::Pending(pipeline) => pipeline.start(),
                EventsState::Running(rx) => rx,
            };
            rx.recv()
                .await
                .map(|event| (event, EventsState::Running(rx)))
        })
        .boxed()
    }
}

enum EventsState {
    Pending(Pipeline),
    Running(mpsc::UnboundedReceiver<PipelineEvent>),
}
