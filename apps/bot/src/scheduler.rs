//! Named repeating background tasks.
//!
//! Each task runs on its own tokio task at a fixed rate. Runs of one task
//! never overlap: a tick that falls while the previous run is still busy
//! is skipped. Cancelling takes effect between runs, so a run in progress
//! always completes (browser sessions get closed).

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What a task wants after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

struct Entry {
    id: u64,
    // Dropping the sender cancels the task
    _cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

type Registry = Arc<Mutex<HashMap<String, Entry>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<String, Entry>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct JobScheduler {
    tasks: Registry,
    next_id: Arc<AtomicU64>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `first`, then every `interval`
    ///
    /// A task already registered under `name` is cancelled and replaced.
    pub fn run_repeating<F, Fut>(&self, name: &str, first: Duration, interval: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Flow> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let registry = Arc::clone(&self.tasks);
        let task_name = name.to_string();
        let period = interval.max(Duration::from_millis(1));

        let mut tasks = lock(&self.tasks);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => return,
                    _ = ticker.tick() => {}
                }
                if task().await == Flow::Stop {
                    break;
                }
            }

            tracing::debug!(task = %task_name, "Task stopped itself");
            let mut tasks = lock(&registry);
            if tasks.get(&task_name).is_some_and(|entry| entry.id == id) {
                tasks.remove(&task_name);
            }
        });

        let entry = Entry {
            id,
            _cancel: cancel_tx,
            handle,
        };
        if tasks.insert(name.to_string(), entry).is_some() {
            tracing::info!(task = name, "Replaced existing task");
        } else {
            tracing::debug!(task = name, "Scheduled task");
        }
    }

    /// Cancels the task called `name`; returns whether one existed
    pub fn cancel(&self, name: &str) -> bool {
        let removed = lock(&self.tasks).remove(name).is_some();
        if removed {
            tracing::info!(task = name, "Cancelled task");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        lock(&self.tasks).contains_key(name)
    }

    /// Names of the registered tasks, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.tasks).keys().cloned().collect();
        names.sort();
        names
    }

    /// Aborts every task immediately
    pub fn shutdown(&self) {
        let entries: Vec<Entry> = lock(&self.tasks).drain().map(|(_, entry)| entry).collect();
        for entry in &entries {
            entry.handle.abort();
        }
        tracing::info!(count = entries.len(), "Scheduler shut down");
    }
}
