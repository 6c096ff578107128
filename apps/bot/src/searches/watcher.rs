use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::notifications;
use super::{SearchDeps, SearchError, SearchSettings};
use crate::appointments::{check_within, CheckError};
use crate::bot::keyboards;
use crate::infrastructure::error_reporter::ErrorReport;
use crate::scheduler::Flow;

/// One scheduled search; `tick` is a single scheduler run
pub struct SearchWatcher {
    deps: Arc<SearchDeps>,
    settings: Arc<SearchSettings>,
    user_id: i64,
    job_name: String,
    asked_for_date: AtomicBool,
}

impl SearchWatcher {
    pub fn new(
        deps: Arc<SearchDeps>,
        settings: Arc<SearchSettings>,
        user_id: i64,
        job_name: String,
    ) -> Self {
        Self {
            deps,
            settings,
            user_id,
            job_name,
            asked_for_date: AtomicBool::new(false),
        }
    }

    /// Checks once; errors are reported and the search keeps running
    pub async fn tick(&self) -> Flow {
        tracing::info!(user_id = self.user_id, job = %self.job_name, "Running background job");
        match self.check_once().await {
            Ok(flow) => flow,
            Err(e) => {
                tracing::error!(user_id = self.user_id, job = %self.job_name, error = %e, "Background job error");
                self.deps
                    .reporter
                    .report(
                        ErrorReport::new(self.user_id, "Background job error")
                            .job(&self.job_name)
                            .details(e.to_string()),
                    )
                    .await;
                Flow::Continue
            }
        }
    }

    async fn check_once(&self) -> Result<Flow, SearchError> {
        let deps = &self.deps;
        let Some(job) = deps.jobs.find(self.user_id, &self.job_name).await? else {
            tracing::info!(job = %self.job_name, "Job not found in database");
            return Ok(Flow::Stop);
        };
        if !job.is_active() {
            tracing::info!(job = %self.job_name, "Job is no longer active");
            return Ok(Flow::Stop);
        }

        let preferred = deps
            .submissions
            .latest_preferred_date(self.user_id, &self.job_name)
            .await?;

        if preferred.is_none() && !self.asked_for_date.load(Ordering::Relaxed) {
            if let Some(form) = job.form() {
                let url = keyboards::form_url(
                    &self.settings.forms_url,
                    form,
                    self.user_id,
                    Some(&self.job_name),
                    true,
                );
                deps.messenger
                    .send_message(
                        self.user_id,
                        &notifications::preferred_date_request(&self.job_name),
                        Some(keyboards::set_preferred_date(url).into()),
                    )
                    .await?;
                self.asked_for_date.store(true, Ordering::Relaxed);
            }
        }

        let option = job.service_option();
        tracing::info!(option = %option, "Checking appointments");
        let dates = match check_within(
            deps.checker.as_ref(),
            option,
            preferred.as_deref(),
            self.settings.max_attempts,
            self.settings.check_timeout,
        )
        .await
        {
            Ok(dates) => dates,
            Err(CheckError::TimedOut(limit)) => {
                tracing::warn!(job = %self.job_name, ?limit, "Appointment check timed out");
                return Ok(Flow::Continue);
            }
            Err(e) => {
                tracing::warn!(job = %self.job_name, error = %e, "Appointment check failed");
                deps.reporter
                    .report(
                        ErrorReport::new(self.user_id, "Appointment check failed")
                            .job(&self.job_name)
                            .info("option", option)
                            .details(e.to_string()),
                    )
                    .await;
                return Ok(Flow::Continue);
            }
        };

        if dates.is_empty() {
            tracing::info!(user_id = self.user_id, "No available dates");
            return Ok(Flow::Continue);
        }

        deps.messenger
            .send_message(
                self.user_id,
                &notifications::found_heads_up(&option.description()),
                None,
            )
            .await?;
        deps.messenger
            .send_message(
                self.user_id,
                &notifications::found_details(&self.job_name, &dates),
                None,
            )
            .await?;
        tracing::info!(user_id = self.user_id, job = %self.job_name, "Available dates found");

        deps.jobs.remove(self.user_id, &self.job_name).await?;
        let menu = keyboards::main_menu_for(deps.jobs.as_ref(), self.user_id).await;
        deps.messenger
            .send_message(self.user_id, keyboards::CHOOSE_OPTION, Some(menu.into()))
            .await?;
        Ok(Flow::Stop)
    }
}
