use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::job_queue::JobQueue;
use super::progress::ProgressTracker;
use super::session::{InFlightGuard, SessionState};
use super::thumbnail::ThumbnailFetcher;
use super::PipelineEvent;
use crate::api::MediaFetcher;
use crate::domain::{AppError, DownloadOutcome, Job};

/// The single consumer of the job queue.
///
/// At most one job is between `begin` and the drop of its guard at any time.
pub struct DownloadWorker {
    queue: Arc<JobQueue>,
    session: Arc<SessionState>,
    fetcher: Arc<dyn MediaFetcher>,
    thumbnails: ThumbnailFetcher,
    progress: ProgressTracker,
    events: mpsc::UnboundedSender<PipelineEvent>,
}

impl DownloadWorker {
    pub fn new(
        queue: Arc<JobQueue>,
        session: Arc<SessionState>,
        fetcher: Arc<dyn MediaFetcher>,
        thumbnails: ThumbnailFetcher,
        progress: ProgressTracker,
        events: mpsc::UnboundedSender<PipelineEvent>,
    ) -> Self {
        Self {
            queue,
            session,
            fetcher,
            thumbnails,
            progress,
            events,
        }
    }

    /// Drain the queue forever, one job at a time. Ends when the UI side hangs up.
    pub async fn run(self) {
        loop {
            let job = tokio::select! {
                job = self.next_job() => job,
                () = self.events.closed() => {
                    info!("Event receiver gone, download worker exiting");
                    return;
                }
            };
            let guard = self.claim(&job).await;
            self.process(job, guard).await;
            if self.queue.is_empty() {
                debug!("Queue drained");
            }
        }
    }

    async fn next_job(&self) -> Job {
        self.session.wait_idle().await;
        self.queue.pop().await
    }

    async fn claim(&self, job: &Job) -> InFlightGuard {
        loop {
            if let Some(guard) = self.session.begin(&job.url) {
                return guard;
            }
            self.session.wait_idle().await;
        }
    }

    async fn process(&self, job: Job, guard: InFlightGuard) {
        self.progress.reset();
        let _ = self.events.send(PipelineEvent::FetchStarted(job.url.clone()));

        let outcome = match self.fetch(&job).await {
            Ok(file_name) => {
                info!("Downloaded {} -> {}", job.url, file_name);
                DownloadOutcome::success(&job.url, file_name)
            }
            Err(e) => {
                warn!("{} ({})", e, job.url);
                DownloadOutcome::failure(&job.url)
            }
        };

        guard.completing();
        let _ = self
            .events
            .send(PipelineEvent::DownloadFinished(outcome.clone()));

        if outcome.succeeded {
            self.thumbnails.spawn(outcome, guard);
        } else {
            drop(guard);
        }
    }

    /// Run the fetch on its own task; any error or panic becomes a `FetchFailure`.
    async fn fetch(&self, job: &Job) -> Result<String, AppError> {
        let fetcher = Arc::clone(&self.fetcher);
        let sink = self.progress.clone();
        let directory = self.session.download_directory();
        let url = job.url.clone();

        let task = tokio::spawn(async move { fetcher.fetch(&url, &directory, &sink).await });
        match task.await {
            Ok(Ok(file_name)) if file_name.is_empty() => Err(AppError::FetchFailure(
                "fetcher returned no file name".to_string(),
            )),
            Ok(Ok(file_name)) => Ok(file_name),
            Ok(Err(e)) => Err(AppError::FetchFailure(e.to_string())),
            Err(e) => Err(AppError::FetchFailure(format!("fetch task aborted: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiError, ImageFetcher, ProgressSink, Result as ApiResult, ThumbnailLocator,
    };
    use crate::application::progress::progress_channel;
    use crate::domain::SessionConfig;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;

    struct Failing;

    #[async_trait]
    impl MediaFetcher for Failing {
        async fn fetch(
            &self,
            _url: &str,
            _directory: &Path,
            _sink: &dyn ProgressSink,
        ) -> ApiResult<String> {
            Err(ApiError::NoOutputFile)
        }
    }

    #[async_trait]
    impl ThumbnailLocator for Failing {
        async fn thumbnail_url(&self, _url: &str) -> ApiResult<Option<String>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl ImageFetcher for Failing {
        async fn fetch_image(&self, _image_url: &str) -> ApiResult<bytes::Bytes> {
            Err(ApiError::NoOutputFile)
        }
    }

    fn worker(
        queue: Arc<JobQueue>,
        events: mpsc::UnboundedSender<PipelineEvent>,
    ) -> DownloadWorker {
        let session = Arc::new(SessionState::new(SessionConfig::default()));
        let (tracker, _reporter) = progress_channel();
        let thumbnails = ThumbnailFetcher::new(
            Arc::new(Failing),
            Arc::new(Failing),
            16,
            Duration::from_secs(1),
            events.clone(),
        );
        DownloadWorker::new(
            queue,
            session,
            Arc::new(Failing),
            thumbnails,
            tracker,
            events,
        )
    }

    #[tokio::test]
    async fn test_idle_worker_exits_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let running = tokio::spawn(worker(Arc::new(JobQueue::new()), tx).run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!running.is_finished());
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), running)
            .await
            .expect("worker kept waiting on an empty queue")
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_job_is_reported_and_worker_keeps_going() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queue = Arc::new(JobQueue::new());
        let running = tokio::spawn(worker(queue.clone(), tx).run());

        queue.push("https://example.com/a");
        queue.push("https://example.com/b");
        let mut finished = Vec::new();
        while finished.len() < 2 {
            if let Some(PipelineEvent::DownloadFinished(outcome)) = rx.recv().await {
                finished.push(outcome);
            }
        }
        assert_eq!(
            finished,
            vec![
                DownloadOutcome::failure("https://example.com/a"),
                DownloadOutcome::failure("https://example.com/b"),
            ]
        );
        assert!(!running.is_finished());
    }
}
