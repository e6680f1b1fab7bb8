use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::domain::Job;

/// Unbounded FIFO of pending jobs. Many producers, one consumer.
///
/// No de-duplication: the same URL pushed twice is two jobs.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    pushed: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, VecDeque<Job>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, url: impl Into<String>) {
        self.jobs().push_back(Job::new(url));
        self.pushed.notify_one();
    }

    pub fn try_pop(&self) -> Option<Job> {
        self.jobs().pop_front()
    }

    /// Wait until a job is available and take it.
    pub async fn pop(&self) -> Job {
        loop {
            let notified = self.pushed.notified();
            if let Some(job) = self.try_pop() {
                return job;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
