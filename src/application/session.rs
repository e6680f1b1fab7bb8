use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use log::info;
use tokio::sync::Notify;

use crate::domain::{SessionConfig, WorkerPhase};

#[derive(Debug)]
struct SessionInner {
    is_downloading: bool,
    phase: WorkerPhase,
    auto_download: bool,
    download_directory: PathBuf,
    last_clipboard_text: String,
    current_url: Option<String>,
}

/// Process-wide coordination state shared by the monitor, worker and UI.
pub struct SessionState {
    inner: Mutex<SessionInner>,
    idle: Notify,
}

impl SessionState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                is_downloading: false,
                phase: WorkerPhase::Idle,
                auto_download: config.auto_download,
                download_directory: config.download_directory,
                last_clipboard_text: String::new(),
                current_url: None,
            }),
            idle: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_downloading(&self) -> bool {
        self.lock().is_downloading
    }

    pub fn phase(&self) -> WorkerPhase {
        self.lock().phase
    }

    pub fn auto_download(&self) -> bool {
        self.lock().auto_download
    }

    pub fn set_auto_download(&self, enabled: bool) {
        self.lock().auto_download = enabled;
    }

    pub fn download_directory(&self) -> PathBuf {
        self.lock().download_directory.clone()
    }

    pub fn set_download_directory(&self, directory: PathBuf) {
        self.lock().download_directory = directory;
    }

    pub fn last_clipboard_text(&self) -> String {
        self.lock().last_clipboard_text.clone()
    }

    pub fn set_last_clipboard_text(&self, text: &str) {
        text.clone_into(&mut self.lock().last_clipboard_text);
    }

    pub(crate) fn set_phase(&self, phase: WorkerPhase) {
        self.lock().phase = phase;
    }

    /// Claim the single in-flight slot for `url`.
    ///
    /// Returns `None` while another job holds it.
    pub fn begin(self: &Arc<Self>, url: &str) -> Option<InFlightGuard> {
        let mut inner = self.lock();
        if inner.is_downloading {
            return None;
        }
        inner.is_downloading = true;
        inner.phase = WorkerPhase::Fetching;
        inner.current_url = Some(url.to_string());
        drop(inner);
        info!("Fetching {}", url);
        Some(InFlightGuard {
            session: Arc::clone(self),
        })
    }

    /// Resolve once no job is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.is_downloading() {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        let mut inner = self.lock();
        inner.is_downloading = false;
        inner.phase = WorkerPhase::Idle;
        let url = inner.current_url.take();
        drop(inner);
        if let Some(url) = url {
            info!("Idle after {}", url);
        }
        self.idle.notify_waiters();
    }
}

/// Holds `is_downloading == true` until dropped.
///
/// Travels with the job through the fetch and the thumbnail stage, so every
/// exit path (including a panic in a task) hands the slot back.
pub struct InFlightGuard {
    session: Arc<SessionState>,
}

impl InFlightGuard {
    pub fn completing(&self) {
        self.session.set_phase(WorkerPhase::Completing);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.session.release();
    }
}
