mod api;
mod app;
mod application;
mod domain;
mod logging;
mod settings;
mod ui;
mod utils;

use iced::window;

fn main() -> iced::Result {
    logging::initialize(logging::LogDestination::Both);

    iced::application(app::DownloadApp::boot, app::update, app::view)
        .title("Clipboard Video Downloader")
        .window(window::Settings {
            size: iced::Size::new(560.0, 720.0),
            ..Default::default()
        })
        .run()
}
