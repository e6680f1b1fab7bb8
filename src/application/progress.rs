//! Byte counters to a smoothed 0..=100 display value.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::PipelineEvent;
use crate::api::ProgressSink;

/// Raw counters for the job in flight, plus the last percent derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    /// 0 while unknown.
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub percent: u8,
}

impl ProgressState {
    /// Fold in a sample and return the new target percent.
    ///
    /// The first non-zero total sticks for the rest of the job. Until a total is
    /// known the previous percent is kept.
    pub fn record(&mut self, downloaded: u64, total: u64) -> u8 {
        if self.total_bytes == 0 && total > 0 {
            self.total_bytes = total;
        }
        self.downloaded_bytes = downloaded;
        if self.total_bytes > 0 {
            let pct = (u128::from(downloaded) * 100 / u128::from(self.total_bytes)).min(100);
            self.percent = pct as u8;
        }
        self.percent
    }
}

/// Moves a displayed value toward a target one unit per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSmoother {
    displayed: u8,
    target: u8,
}

impl ProgressSmoother {
    pub fn displayed(&self) -> u8 {
        self.displayed
    }

    pub fn is_settled(&self) -> bool {
        self.displayed == self.target
    }

    /// Set a new target. A lower target is applied immediately and returned.
    pub fn retarget(&mut self, target: u8) -> Option<u8> {
        let target = target.min(100);
        self.target = target;
        if target < self.displayed {
            self.displayed = target;
            return Some(target);
        }
        None
    }

    /// Advance one tick. Returns the new displayed value if it changed.
    pub fn step(&mut self) -> Option<u8> {
        if self.displayed < self.target {
            self.displayed += 1;
            Some(self.displayed)
        } else {
            None
        }
    }
}

/// The worker's side of the progress path.
///
/// Cloned into every fetch; `report` never blocks.
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<Mutex<ProgressState>>,
    target_tx: Arc<watch::Sender<TargetUpdate>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TargetUpdate {
    /// Bumped on every reset so a repeated 0 still reaches the reporter.
    generation: u64,
    percent: u8,
}

impl ProgressTracker {
    /// Zero the counters for a new job and snap the display back to 0.
    pub fn reset(&self) {
        *self.lock() = ProgressState::default();
        self.target_tx.send_modify(|update| {
            update.generation += 1;
            update.percent = 0;
        });
    }

    pub fn snapshot(&self) -> ProgressState {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressSink for ProgressTracker {
    fn report(&self, downloaded: u64, total: u64) {
        let percent = self.lock().record(downloaded, total);
        self.target_tx.send_if_modified(|update| {
            if update.percent == percent {
                return false;
            }
            update.percent = percent;
            true
        });
    }
}

/// Build the tracker/reporter pair.
pub fn progress_channel() -> (ProgressTracker, ProgressReporter) {
    let (target_tx, target_rx) = watch::channel(TargetUpdate::default());
    let tracker = ProgressTracker {
        state: Arc::new(Mutex::new(ProgressState::default())),
        target_tx: Arc::new(target_tx),
    };
    (tracker, ProgressReporter { target_rx })
}

pub struct ProgressReporter {
    target_rx: watch::Receiver<TargetUpdate>,
}

impl ProgressReporter {
    /// Emit `ProgressChanged` for every displayed value until the tracker is gone.
    pub async fn run(mut self, tick: Duration, events: mpsc::UnboundedSender<PipelineEvent>) {
        let mut smoother = ProgressSmoother::default();
        let mut generation = 0;
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if smoother.is_settled() {
                if self.target_rx.changed().await.is_err() {
                    return;
                }
                // Start the next animation from a fresh tick.
                ticker.reset();
            } else {
                ticker.tick().await;
            }

            let update = *self.target_rx.borrow_and_update();
            if update.generation != generation {
                generation = update.generation;
                smoother.retarget(0);
                if events.send(PipelineEvent::ProgressChanged(0)).is_err() {
                    return;
                }
                if update.percent == 0 {
                    continue;
                }
            }
            if let Some(jumped) = smoother.retarget(update.percent) {
                if events.send(PipelineEvent::ProgressChanged(jumped)).is_err() {
                    return;
                }
                continue;
            }
            if smoother.is_settled() {
                continue;
            }
            if smoother.step().is_some()
                && events
                    .send(PipelineEvent::ProgressChanged(smoother.displayed()))
                    .is_err()
            {
                return;
            }
        }
    }
}
