// Scheduled appointment searches
//
// Every active search gets a repeating scheduler task that checks the
// booking site and notifies the user once slots show up.

pub mod notifications;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::appointments::{AppointmentChecker, DEFAULT_MAX_ATTEMPTS};
use crate::domain::job::SearchJob;
use crate::domain::repositories::{
    JobRepository, RepositoryError, RepositoryResult, SubmissionRepository,
};
use crate::infrastructure::error_reporter::ErrorReporter;
use crate::infrastructure::telegram::{Messenger, TelegramError};
use crate::scheduler::{Flow, JobScheduler};

pub use watcher::SearchWatcher;

/// Name of the sweeper task that picks up newly activated searches
pub const SWEEPER_TASK: &str = "check_for_new_jobs";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

/// Scheduler task name of a search
pub fn task_name(user_id: i64, job_name: &str) -> String {
    format!("check_dates_{}_{}", user_id, job_name)
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub interval: Duration,
    pub check_timeout: Duration,
    /// Delay before the first run of restored and swept searches
    pub startup_delay: Duration,
    pub max_attempts: u32,
    /// Base URL of the hosted registration forms
    pub forms_url: String,
}

impl SearchSettings {
    pub fn new(forms_url: impl Into<String>, interval: Duration) -> Self {
        Self {
            interval,
            check_timeout: Duration::from_secs(60),
            startup_delay: Duration::from_secs(5),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            forms_url: forms_url.into(),
        }
    }
}

/// Collaborators of the search tasks
pub struct SearchDeps {
    pub jobs: Arc<dyn JobRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub messenger: Arc<dyn Messenger>,
    pub checker: Arc<dyn AppointmentChecker>,
    pub reporter: ErrorReporter,
}

/// Starts, stops and restores the per-search tasks
#[derive(Clone)]
pub struct SearchService {
    deps: Arc<SearchDeps>,
    settings: Arc<SearchSettings>,
    scheduler: JobScheduler,
}

impl SearchService {
    pub fn new(deps: SearchDeps, settings: SearchSettings, scheduler: JobScheduler) -> Self {
        Self {
            deps: Arc::new(deps),
            settings: Arc::new(settings),
            scheduler,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Schedules `job`, replacing any task already running for it
    pub fn start(&self, job: &SearchJob, first: Duration) {
        let watcher = Arc::new(SearchWatcher::new(
            Arc::clone(&self.deps),
            Arc::clone(&self.settings),
            job.user_id,
            job.name.clone(),
        ));
        self.scheduler.run_repeating(
            &task_name(job.user_id, &job.name),
            first,
            self.settings.interval,
            move || {
                let watcher = Arc::clone(&watcher);
                async move { watcher.tick().await }
            },
        );
        tracing::info!(user_id = job.user_id, job = %job.name, "Started search");
    }

    /// Cancels the task of a search; returns whether one was running
    pub fn stop(&self, user_id: i64, job_name: &str) -> bool {
        self.scheduler.cancel(&task_name(user_id, job_name))
    }

    pub fn is_running(&self, user_id: i64, job_name: &str) -> bool {
        self.scheduler.contains(&task_name(user_id, job_name))
    }

    /// Reschedules every active search after a restart
    pub async fn restore_active(&self) -> RepositoryResult<usize> {
        let active = self.deps.jobs.list_active().await?;
        tracing::info!(count = active.len(), "Restarting active jobs");
        for job in &active {
            self.start(job, self.settings.startup_delay);
        }
        Ok(active.len())
    }

    /// Schedules active searches that have no task yet
    pub async fn schedule_new(&self) -> RepositoryResult<usize> {
        let active = self.deps.jobs.list_active().await?;
        tracing::debug!(count = active.len(), "Checking potentially new jobs");
        let mut scheduled = 0;
        for job in active.iter().filter(|job| !self.is_running(job.user_id, &job.name)) {
            self.start(job, self.settings.startup_delay);
            scheduled += 1;
        }
        Ok(scheduled)
    }

    /// Runs [`Self::schedule_new`] every interval
    pub fn start_sweeper(&self) {
        let service = self.clone();
        self.scheduler.run_repeating(
            SWEEPER_TASK,
            self.settings.startup_delay,
            self.settings.interval,
            move || {
                let service = service.clone();
                async move {
                    if let Err(e) = service.schedule_new().await {
                        tracing::error!(error = %e, "Error in job checking process");
                    }
                    Flow::Continue
                }
            },
        );
    }
}
