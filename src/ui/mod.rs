use iced::{
    widget::{
        button, column, image, progress_bar, row, scrollable, text, text_input, toggler, Space,
    },
    Alignment, Element, Length,
};

/// One row of the download history.
pub struct HistoryRow {
    pub name: String,
    pub thumbnail: Option<image::Handle>,
}

/// Main view state
pub struct DownloadView {
    pub url_input: String,
    pub status_message: String,
    pub phase_label: &'static str,
    pub directory_label: String,
    pub progress: u8,
    pub bytes_label: String,
    pub queued: usize,
    pub busy: bool,
    pub auto_download: bool,
    pub watch_clipboard: bool,
    pub history: Vec<HistoryRow>,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            url_input: String::new(),
            status_message: "Paste or copy a video link to download".to_string(),
            phase_label: "Idle",
            directory_label: String::new(),
            progress: 0,
            bytes_label: String::new(),
            queued: 0,
            busy: false,
            auto_download: false,
            watch_clipboard: false,
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    DownloadPressed,
    AutoDownloadToggled(bool),
    WatchClipboardToggled(bool),
    ChooseDirectoryPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.url_input = url;
            }
            DownloadMessage::AutoDownloadToggled(enabled) => {
                self.auto_download = enabled;
            }
            DownloadMessage::WatchClipboardToggled(enabled) => {
                self.watch_clipboard = enabled;
            }
            DownloadMessage::DownloadPressed | DownloadMessage::ChooseDirectoryPressed => {
                // Will be handled by the app
            }
        }
    }

    /// Newest entries go on top.
    pub fn push_history(&mut self, row: HistoryRow) {
        self.history.insert(0, row);
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let history = self.history.iter().fold(column![].spacing(8), |list, entry| {
            let thumb: Element<'_, DownloadMessage> = match &entry.thumbnail {
                Some(handle) => image(handle.clone()).width(Length::Fixed(96.0)).into(),
                None => Space::new().width(Length::Fixed(96.0)).into(),
            };
            list.push(
                row![thumb, text(&entry.name).size(14)]
                    .spacing(10)
                    .align_y(Alignment::Center),
            )
        });

        column![
            text("Clipboard Video Downloader").size(28),
            Space::new().height(Length::Fixed(10.0)),
            row![
                text_input("https://...", &self.url_input)
                    .on_input(DownloadMessage::UrlChanged)
                    .on_submit(DownloadMessage::DownloadPressed)
                    .padding(10),
                button(if self.busy { "Queue" } else { "Download" })
                    .on_press(DownloadMessage::DownloadPressed)
                    .padding([10, 20]),
            ]
            .spacing(10),
            row![
                toggler(self.watch_clipboard)
                    .label("Watch clipboard")
                    .on_toggle(DownloadMessage::WatchClipboardToggled),
                toggler(self.auto_download)
                    .label("Download copied links")
                    .on_toggle(DownloadMessage::AutoDownloadToggled),
            ]
            .spacing(20),
            row![
                text(format!("Save to: {}", self.directory_label)).size(14),
                button("Change...").on_press(DownloadMessage::ChooseDirectoryPressed),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            row![
                progress_bar(0.0..=100.0, f32::from(self.progress)),
                text(&self.bytes_label).size(12),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            text(format!(
                "[{}] {} ({} queued)",
                self.phase_label, self.status_message, self.queued
            ))
            .size(14),
            Space::new().height(Length::Fixed(10.0)),
            scrollable(history).height(Length::Fill),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}
