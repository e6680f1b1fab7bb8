use crate::api::{FetcherConfig, ImageClient, YtDlp};
use crate::application::{Pipeline, PipelineConfig, PipelineEvent, PipelineHandle};
use crate::domain::WorkerPhase;
use crate::settings::Settings;
use crate::ui::{DownloadMessage, DownloadView, HistoryRow};
use crate::utils::{format_bytes, is_url};
use iced::widget::image;
use iced::Task;
use log::{debug, error, warn};
use std::path::PathBuf;
use std::sync::Arc;

pub struct DownloadApp {
    view: DownloadView,
    pipeline: PipelineHandle,
    settings: Settings,
    settings_path: PathBuf,
}

impl DownloadApp {
    /// Build the app and the task that runs the download pipeline.
    pub fn boot() -> (Self, Task<Message>) {
        let settings_path = Settings::default_path();
        let settings = Settings::load(&settings_path);

        let fetcher_config = FetcherConfig::default();
        let ytdlp = Arc::new(YtDlp::new(fetcher_config.clone()));
        let images = Arc::new(ImageClient::new(fetcher_config.image_timeout));
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            settings.session_config(),
            ytdlp.clone(),
            ytdlp,
            images,
        );
        let handle = pipeline.handle();

        let mut view = DownloadView {
            auto_download: settings.auto_download,
            directory_label: settings.download_directory.display().to_string(),
            ..DownloadView::default()
        };
        if settings.watch_clipboard {
            match handle.set_clipboard_watch(true) {
                Ok(()) => view.watch_clipboard = true,
                Err(e) => error!("{}", e),
            }
        }

        let app = Self {
            view,
            pipeline: handle,
            settings,
            settings_path,
        };
        (app, Task::stream(pipeline.into_events()).map(Message::Pipeline))
    }

    fn save_settings(&mut self) {
        self.settings.auto_download = self.pipeline.auto_download();
        self.settings.watch_clipboard = self.pipeline.is_watching_clipboard();
        self.settings.download_directory = self.pipeline.download_directory();
        if let Err(e) = self.settings.save(&self.settings_path) {
            warn!("Failed to save settings to {:?}: {}", self.settings_path, e);
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    Pipeline(PipelineEvent),
    /// Folder picked in the dialog, `None` if cancelled
    DirectorySelected(Option<PathBuf>),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::DownloadPressed => {
                    let url = requested_url(
                        &app.view.url_input,
                        &app.pipeline.last_clipboard_text(),
                        app.pipeline.auto_download(),
                    );
                    match app.pipeline.enqueue(&url) {
                        Ok(()) => app.view.url_input.clear(),
                        Err(e) => debug!("Download request dropped: {}", e),
                    }
                }
                DownloadMessage::AutoDownloadToggled(enabled) => {
                    app.pipeline.set_auto_download(enabled);
                    app.save_settings();
                }
                DownloadMessage::WatchClipboardToggled(enabled) => {
                    if let Err(e) = app.pipeline.set_clipboard_watch(enabled) {
                        error!("{}", e);
                        app.view.watch_clipboard = false;
                        app.view.status_message = e.to_string();
                    }
                    app.save_settings();
                }
                DownloadMessage::ChooseDirectoryPressed => {
                    let start = app.pipeline.download_directory();
                    return Task::perform(
                        async move {
                            rfd::AsyncFileDialog::new()
                                .set_directory(&start)
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::DirectorySelected,
                    );
                }
                DownloadMessage::UrlChanged(_) => {}
            }
        }
        Message::DirectorySelected(Some(directory)) => {
            app.view.directory_label = directory.display().to_string();
            app.pipeline.set_download_directory(directory);
            app.save_settings();
        }
        Message::DirectorySelected(None) => {}
        Message::Pipeline(event) => on_pipeline_event(app, event),
    }
    Task::none()
}

/// The URL a Download press refers to. An empty field means the last copied
/// text, unless auto-download already queued it.
fn requested_url(input: &str, last_clipboard: &str, auto_download: bool) -> String {
    let input = input.trim();
    if input.is_empty() && !auto_download {
        last_clipboard.trim().to_string()
    } else {
        input.to_string()
    }
}

fn on_pipeline_event(app: &mut DownloadApp, event: PipelineEvent) {
    app.view.phase_label = match app.pipeline.phase() {
        WorkerPhase::Idle => "Idle",
        WorkerPhase::Fetching => "Downloading",
        WorkerPhase::Completing => "Finishing",
    };
    app.view.busy = app.pipeline.is_downloading();
    match event {
        PipelineEvent::ClipboardChanged(text) => {
            if is_url(&text) {
                app.view.url_input = text;
            }
        }
        PipelineEvent::Enqueued(_) => {
            app.view.queued = app.pipeline.pending_jobs();
        }
        PipelineEvent::FetchStarted(url) => {
            app.view.queued = app.pipeline.pending_jobs();
            app.view.status_message = format!("Downloading: {}", url);
        }
        PipelineEvent::ProgressChanged(percent) => {
            app.view.progress = percent;
            let progress = app.pipeline.progress();
            app.view.bytes_label = if progress.total_bytes > 0 {
                format!(
                    "{} / {}",
                    format_bytes(progress.downloaded_bytes),
                    format_bytes(progress.total_bytes)
                )
            } else if progress.downloaded_bytes > 0 {
                format_bytes(progress.downloaded_bytes)
            } else {
                String::new()
            };
        }
        PipelineEvent::DownloadFinished(outcome) => {
            if outcome.succeeded {
                app.view.status_message = format!("Saved: {}", outcome.local_file_name);
                if app.view.url_input == outcome.url {
                    app.view.url_input.clear();
                }
            } else {
                app.view.status_message = format!("Download failed: {}", outcome.url);
            }
        }
        PipelineEvent::ThumbnailReady {
            display_name,
            image: thumbnail,
        } => {
            app.view.push_history(HistoryRow {
                name: display_name,
                thumbnail: thumbnail
                    .map(|t| image::Handle::from_rgba(t.width, t.height, t.rgba)),
            });
        }
    }
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionConfig;
    use std::time::Duration;

    fn test_app() -> DownloadApp {
        let ytdlp = Arc::new(YtDlp::new(FetcherConfig::default()));
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            SessionConfig::default(),
            ytdlp.clone(),
            ytdlp,
            Arc::new(ImageClient::new(Duration::from_secs(1))),
        );
        DownloadApp {
            view: DownloadView::default(),
            pipeline: pipeline.handle(),
            settings: Settings::default(),
            settings_path: PathBuf::from("unused.json"),
        }
    }

    #[test]
    fn test_requested_url_prefers_the_field() {
        assert_eq!(
            requested_url(" https://a ", "https://b", false),
            "https://a"
        );
        assert_eq!(requested_url("", " https://b ", false), "https://b");
    }

    #[test]
    fn test_requested_url_skips_clipboard_when_auto_downloading() {
        assert_eq!(requested_url("  ", "https://b", true), "");
    }

    #[test]
    fn test_invalid_url_leaves_status_alone() {
        let mut app = test_app();
        let status = app.view.status_message.clone();

        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::UrlChanged("not a url".to_string())),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));

        assert_eq!(app.view.status_message, status);
        assert_eq!(app.view.url_input, "not a url");
        assert_eq!(app.pipeline.pending_jobs(), 0);
    }

    #[test]
    fn test_valid_url_is_queued_and_field_cleared() {
        let mut app = test_app();
        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::UrlChanged(
                "https://example.com/v".to_string(),
            )),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));

        assert!(app.view.url_input.is_empty());
        assert_eq!(app.pipeline.pending_jobs(), 1);
    }
}
