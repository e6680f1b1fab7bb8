//! Fixed-interval clipboard polling on a dedicated thread.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

/// Something that can report the current clipboard text.
pub trait ClipboardSource {
    /// `None` when the clipboard holds no text or could not be read.
    fn read_text(&mut self) -> Option<String>;
}

/// System clipboard through `arboard`.
///
/// A failed open is retried on the next read.
#[derive(Default)]
pub struct ArboardClipboard {
    clipboard: Option<arboard::Clipboard>,
}

impl ClipboardSource for ArboardClipboard {
    fn read_text(&mut self) -> Option<String> {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard unavailable: {}", e);
                    return None;
                }
            }
        }
        let clipboard = self.clipboard.as_mut()?;
        match clipboard.get_text() {
            Ok(text) => Some(text),
            Err(arboard::Error::ContentNotAvailable) => Some(String::new()),
            Err(e) => {
                debug!("Clipboard read failed: {}", e);
                self.clipboard = None;
                None
            }
        }
    }
}

/// Emits the clipboard text each time it differs from the previous tick.
pub struct ClipboardMonitor {
    stop_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

/// Owns the clipboard source on its own thread so a stuck read cannot stall
/// the tick loop. Dropping `requests` ends the thread once its current read
/// returns.
struct Reader {
    requests: mpsc::Sender<()>,
    replies: mpsc::Receiver<Option<String>>,
    pending: bool,
}

impl Reader {
    fn spawn<S, F>(make_source: F) -> std::io::Result<Self>
    where
        S: ClipboardSource,
        F: FnOnce() -> S + Send + 'static,
    {
        let (requests, request_rx) = mpsc::channel::<()>();
        let (reply_tx, replies) = mpsc::channel();
        thread::Builder::new()
            .name("clipboard-reader".into())
            .spawn(move || {
                let mut source = make_source();
                while request_rx.recv().is_ok() {
                    if reply_tx.send(source.read_text()).is_err() {
                        break;
                    }
                }
            })?;
        Ok(Self {
            requests,
            replies,
            pending: false,
        })
    }

    /// One read bounded by `timeout`. `None` on timeout, failure, or while an
    /// earlier read is still outstanding.
    fn read(&mut self, timeout: Duration) -> Option<String> {
        if self.pending {
            match self.replies.try_recv() {
                // A late answer still describes the clipboard; use it.
                Ok(text) => {
                    self.pending = false;
                    return text;
                }
                Err(_) => return None,
            }
        }
        self.requests.send(()).ok()?;
        match self.replies.recv_timeout(timeout) {
            Ok(text) => text,
            Err(_) => {
                debug!("Clipboard read exceeded {:?}", timeout);
                self.pending = true;
                None
            }
        }
    }
}

impl ClipboardMonitor {
    /// Start polling every `interval`. Each read is given at most
    /// `read_timeout`; a read that overruns counts as no change.
    ///
    /// `make_source` runs on a reader thread, so the source need not be
    /// `Send`. `on_change` runs inline in the tick: the next tick does not
    /// start until it returns.
    pub fn spawn<S, F, H>(
        make_source: F,
        interval: Duration,
        read_timeout: Duration,
        mut on_change: H,
    ) -> std::io::Result<Self>
    where
        S: ClipboardSource,
        F: FnOnce() -> S + Send + 'static,
        H: FnMut(String) + Send + 'static,
    {
        let mut reader = Reader::spawn(make_source)?;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("clipboard-monitor".into())
            .spawn(move || {
                info!("Clipboard monitor started ({:?} interval)", interval);
                let mut previous = String::new();
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let Some(text) = reader.read(read_timeout) else {
                        continue;
                    };
                    if text != previous {
                        previous.clone_from(&text);
                        on_change(text);
                    }
                }
                info!("Clipboard monitor stopped");
            })?;

        Ok(Self {
            stop_tx,
            thread: Some(thread),
        })
    }

    /// Halt future ticks and wait for the current one, if any, to finish.
    ///
    /// Returns within one read timeout even if the clipboard is stuck.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Clipboard monitor thread panicked");
            }
        }
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    const READ_TIMEOUT: Duration = Duration::from_secs(1);

    /// Replays a fixed list of reads, then repeats the last one.
    pub(crate) struct ScriptedClipboard {
        reads: VecDeque<String>,
        last: String,
    }

    impl ScriptedClipboard {
        pub(crate) fn new(reads: &[&str]) -> Self {
            Self {
                reads: reads.iter().map(|s| s.to_string()).collect(),
                last: String::new(),
            }
        }
    }

    impl ClipboardSource for ScriptedClipboard {
        fn read_text(&mut self) -> Option<String> {
            if let Some(next) = self.reads.pop_front() {
                self.last = next;
            }
            Some(self.last.clone())
        }
    }

    fn wait_for(events: &Arc<Mutex<Vec<String>>>, count: usize) {
        for _ in 0..200 {
            if events.lock().unwrap().len() >= count {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_emits_only_on_change() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let monitor = ClipboardMonitor::spawn(
            || ScriptedClipboard::new(&["", "", "https://a", "https://a", "text", "https://a"]),
            Duration::from_millis(1),
            READ_TIMEOUT,
            move |text| sink.lock().unwrap().push(text),
        )
        .unwrap();

        wait_for(&events, 3);
        monitor.stop();
        assert_eq!(*events.lock().unwrap(), vec!["https://a", "text", "https://a"]);
    }

    #[test]
    fn test_no_events_after_stop() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let counter = Arc::new(Mutex::new(0u32));
        let reads = counter.clone();

        struct Counting(Arc<Mutex<u32>>);
        impl ClipboardSource for Counting {
            fn read_text(&mut self) -> Option<String> {
                let mut n = self.0.lock().unwrap();
                *n += 1;
                Some(format!("https://example.com/{}", n))
            }
        }

        let monitor = ClipboardMonitor::spawn(
            move || Counting(reads),
            Duration::from_millis(1),
            READ_TIMEOUT,
            move |text| sink.lock().unwrap().push(text),
        )
        .unwrap();
        wait_for(&events, 2);
        monitor.stop();

        let seen = events.lock().unwrap().len();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(events.lock().unwrap().len(), seen);
        assert_eq!(*counter.lock().unwrap() as usize, seen);
    }

    #[test]
    fn test_unreadable_clipboard_is_no_change() {
        struct Flaky(u32);
        impl ClipboardSource for Flaky {
            fn read_text(&mut self) -> Option<String> {
                self.0 += 1;
                match self.0 {
                    1 => Some("https://a".to_string()),
                    2 | 3 => None,
                    _ => Some("https://a".to_string()),
                }
            }
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let monitor = ClipboardMonitor::spawn(
            || Flaky(0),
            Duration::from_millis(1),
            READ_TIMEOUT,
            move |text| sink.lock().unwrap().push(text),
        )
        .unwrap();
        wait_for(&events, 1);
        thread::sleep(Duration::from_millis(20));
        monitor.stop();
        assert_eq!(*events.lock().unwrap(), vec!["https://a"]);
    }

    #[test]
    fn test_stuck_read_is_no_change_and_stop_returns_promptly() {
        struct Stuck;
        impl ClipboardSource for Stuck {
            fn read_text(&mut self) -> Option<String> {
                thread::sleep(Duration::from_secs(2));
                Some("https://late".to_string())
            }
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let monitor = ClipboardMonitor::spawn(
            || Stuck,
            Duration::from_millis(1),
            Duration::from_millis(10),
            move |text| sink.lock().unwrap().push(text),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        monitor.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_slow_read_is_picked_up_on_a_later_tick() {
        struct SlowOnce(bool);
        impl ClipboardSource for SlowOnce {
            fn read_text(&mut self) -> Option<String> {
                if !self.0 {
                    self.0 = true;
                    thread::sleep(Duration::from_millis(40));
                }
                Some("https://a".to_string())
            }
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let monitor = ClipboardMonitor::spawn(
            || SlowOnce(false),
            Duration::from_millis(1),
            Duration::from_millis(5),
            move |text| sink.lock().unwrap().push(text),
        )
        .unwrap();
        wait_for(&events, 1);
        thread::sleep(Duration::from_millis(20));
        monitor.stop();
        assert_eq!(*events.lock().unwrap(), vec!["https://a"]);
    }
}
