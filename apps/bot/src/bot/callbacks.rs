use std::time::Duration;

use super::handlers::preferred_date_updated;
use super::keyboards;
use super::{Bot, BotResult};
use crate::appointments::{check_within, CheckError};
use crate::domain::job::SearchJob;
use crate::infrastructure::error_reporter::user_friendly_message;
use crate::infrastructure::telegram::CallbackQuery;

/// Budget of a manual check of one search
pub const MANUAL_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

const SEARCH_NOT_FOUND: &str = "Search not found. It may have been canceled already.";

/// Inline button payloads; searches are referenced by row id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CancelAll,
    Cancel(i32),
    CheckAll,
    Check(i32),
    PreferredDate(i32),
    SetDate(i32),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "cancel_all" => return Some(CallbackAction::CancelAll),
            "check_all" => return Some(CallbackAction::CheckAll),
            _ => {}
        }
        let (prefix, id) = data.split_once('_')?;
        let id: i32 = id.parse().ok()?;
        match prefix {
            "cancel" => Some(CallbackAction::Cancel(id)),
            "check" => Some(CallbackAction::Check(id)),
            "date" => Some(CallbackAction::PreferredDate(id)),
            "setdate" => Some(CallbackAction::SetDate(id)),
            _ => None,
        }
    }
}

/// Outcome line of one manual check
enum ManualCheck {
    Found(Vec<String>),
    NoDates,
    TimedOut,
    Failed,
}

impl Bot {
    pub(crate) async fn handle_callback(&self, query: CallbackQuery) -> BotResult<()> {
        self.deps.messenger.answer_callback(&query.id).await?;

        let Some(message) = query.message else {
            return Ok(());
        };
        let Some(action) = query.data.as_deref().and_then(CallbackAction::parse) else {
            tracing::warn!(data = ?query.data, "Unknown callback data");
            return Ok(());
        };
        let user_id = query.from.id;
        let chat_id = message.chat.id;

        match action {
            CallbackAction::CancelAll => self.cancel_all(chat_id, message.message_id, user_id).await,
            CallbackAction::Cancel(id) => {
                self.cancel_one(chat_id, message.message_id, user_id, id).await
            }
            CallbackAction::CheckAll => self.check_all(chat_id, user_id).await,
            CallbackAction::Check(id) => self.check_one(chat_id, user_id, id).await,
            CallbackAction::PreferredDate(id) => {
                self.pick_preferred_date_job(chat_id, message.message_id, user_id, id)
                    .await
            }
            CallbackAction::SetDate(id) => {
                self.ask_preferred_date(chat_id, message.message_id, user_id, id)
                    .await
            }
        }
    }

    async fn edit(&self, chat_id: i64, message_id: i64, text: &str) -> BotResult<()> {
        self.deps
            .messenger
            .edit_message(chat_id, message_id, text, None)
            .await?;
        Ok(())
    }

    async fn cancel_all(&self, chat_id: i64, message_id: i64, user_id: i64) -> BotResult<()> {
        self.edit(chat_id, message_id, "Canceling appointment search...").await?;

        let jobs = self.deps.jobs.list_for_user(user_id).await?;
        if jobs.is_empty() {
            return self
                .edit(chat_id, message_id, "You don't have any active searches to cancel.")
                .await;
        }

        let count = jobs.len();
        self.edit(
            chat_id,
            message_id,
            &format!("Canceling {} appointment searches...", count),
        )
        .await?;
        let outcome = self.remove_jobs(user_id, &jobs).await;
        let text = match outcome {
            Ok(()) => format!("Successfully canceled all {} appointment searches.", count),
            Err(e) => {
                tracing::error!(user_id, error = %e, "Error while canceling");
                format!("Error while canceling: {}", e)
            }
        };
        self.edit(chat_id, message_id, &text).await?;
        self.reply_with_menu(chat_id, user_id, keyboards::CHOOSE_OPTION)
            .await
    }

    async fn cancel_one(
        &self,
        chat_id: i64,
        message_id: i64,
        user_id: i64,
        job_id: i32,
    ) -> BotResult<()> {
        self.edit(chat_id, message_id, "Canceling appointment search...").await?;

        let text = match self.deps.jobs.find_by_id(user_id, job_id).await {
            Ok(Some(job)) => match self.remove_jobs(user_id, std::slice::from_ref(&job)).await {
                Ok(()) => format!("Canceled search for {}.", job.name),
                Err(e) => format!("Error while canceling: {}", e),
            },
            Ok(None) => SEARCH_NOT_FOUND.to_string(),
            Err(e) => format!("Error while canceling: {}", e),
        };
        self.edit(chat_id, message_id, &text).await?;
        self.reply_with_menu(chat_id, user_id, keyboards::CHOOSE_OPTION)
            .await
    }

    async fn remove_jobs(&self, user_id: i64, jobs: &[SearchJob]) -> BotResult<()> {
        for job in jobs {
            self.deps.jobs.remove(user_id, &job.name).await?;
            if self.deps.searches.stop(user_id, &job.name) {
                tracing::info!(user_id, job = %job.name, "Removed background job");
            }
        }
        Ok(())
    }

    async fn manual_check(&self, job: &SearchJob) -> ManualCheck {
        let result = check_within(
            self.deps.checker.as_ref(),
            job.service_option(),
            None,
            1,
            MANUAL_CHECK_TIMEOUT,
        )
        .await;
        match result {
            Ok(dates) if dates.is_empty() => ManualCheck::NoDates,
            Ok(dates) => ManualCheck::Found(dates.labels()),
            Err(CheckError::TimedOut(_)) => ManualCheck::TimedOut,
            Err(e) => {
                tracing::error!(job = %job.name, error = %e, "Error checking job");
                ManualCheck::Failed
            }
        }
    }

    async fn check_all(&self, chat_id: i64, user_id: i64) -> BotResult<()> {
        let status = self
            .reply(chat_id, "Starting appointment check... This may take a moment.", None)
            .await?;

        let outcome = self.check_all_into(chat_id, status, user_id).await;
        if let Err(e) = outcome {
            tracing::error!(user_id, error = %e, "Error in check appointments");
            self.edit(chat_id, status, "An error occurred while checking appointments.")
                .await?;
        }
        self.reply_with_menu(chat_id, user_id, keyboards::CHOOSE_OPTION)
            .await
    }

    async fn check_all_into(&self, chat_id: i64, status: i64, user_id: i64) -> BotResult<()> {
        let jobs = self.deps.jobs.list_for_user(user_id).await?;
        if jobs.is_empty() {
            return self
                .edit(chat_id, status, "You don't have any active appointments to check.")
                .await;
        }

        self.edit(
            chat_id,
            status,
            &format!("Checking {} appointments. Please wait...", jobs.len()),
        )
        .await?;

        let mut results = Vec::with_capacity(jobs.len());
        for job in &jobs {
            self.edit(chat_id, status, &format!("Checking appointment: {}...", job.name))
                .await?;
            let line = match self.manual_check(job).await {
                ManualCheck::Found(dates) => format!("✅ {}: {}", job.name, dates.join(", ")),
                ManualCheck::NoDates => format!("❌ {}: No available dates", job.name),
                ManualCheck::TimedOut => format!("⚠️ {}: Check timed out", job.name),
                ManualCheck::Failed => format!("⚠️ {}: Error during check", job.name),
            };
            results.push(line);
        }

        self.edit(
            chat_id,
            status,
            &format!("Appointment check completed.\n\n{}", results.join("\n")),
        )
        .await
    }

    async fn check_one(&self, chat_id: i64, user_id: i64, job_id: i32) -> BotResult<()> {
        let status = self
            .reply(chat_id, "Starting appointment check... This may take a moment.", None)
            .await?;

        let outcome = self.check_one_into(chat_id, status, user_id, job_id).await;
        if let Err(e) = outcome {
            tracing::error!(user_id, error = %e, "Error in check appointments");
            self.edit(chat_id, status, "An error occurred while checking appointments.")
                .await?;
        }
        self.reply_with_menu(chat_id, user_id, keyboards::CHOOSE_OPTION)
            .await
    }

    async fn check_one_into(
        &self,
        chat_id: i64,
        status: i64,
        user_id: i64,
        job_id: i32,
    ) -> BotResult<()> {
        let Some(job) = self.deps.jobs.find_by_id(user_id, job_id).await? else {
            return self.edit(chat_id, status, SEARCH_NOT_FOUND).await;
        };

        self.edit(chat_id, status, &format!("Checking appointment: {}...", job.name))
            .await?;
        let text = match self.manual_check(&job).await {
            ManualCheck::Found(dates) => format!(
                "✅ Available dates found for {}:\n\n{}",
                job.name,
                dates.join(", ")
            ),
            ManualCheck::NoDates => format!("❌ No available dates found for {}.", job.name),
            ManualCheck::TimedOut => format!("⚠️ Check timed out for {}.", job.name),
            ManualCheck::Failed => format!(
                "⚠️ Error checking {}.\n\n{}",
                job.name,
                user_friendly_message(Some(job.service_type))
            ),
        };
        self.edit(chat_id, status, &text).await
    }

    async fn pick_preferred_date_job(
        &self,
        chat_id: i64,
        message_id: i64,
        user_id: i64,
        job_id: i32,
    ) -> BotResult<()> {
        let Some(date) = self.sessions.get(user_id).pending_preferred_date else {
            return self
                .edit(
                    chat_id,
                    message_id,
                    "Session expired. Please provide your preferred date again.",
                )
                .await;
        };
        let Some(job) = self.deps.jobs.find_by_id(user_id, job_id).await? else {
            return self.edit(chat_id, message_id, SEARCH_NOT_FOUND).await;
        };

        match self
            .deps
            .submissions
            .set_preferred_date(user_id, &job.name, &date)
            .await
        {
            Ok(()) => {
                self.edit(chat_id, message_id, &preferred_date_updated(&job.name, &date))
                    .await?;
                self.sessions
                    .update(user_id, |s| s.pending_preferred_date = None);
                self.reply_with_menu(chat_id, user_id, keyboards::CHOOSE_OPTION)
                    .await
            }
            Err(e) => {
                tracing::error!(user_id, job = %job.name, error = %e, "Failed to update preferred date");
                self.edit(
                    chat_id,
                    message_id,
                    "Failed to update preferred date. Please try again later.",
                )
                .await
            }
        }
    }

    async fn ask_preferred_date(
        &self,
        chat_id: i64,
        message_id: i64,
        user_id: i64,
        job_id: i32,
    ) -> BotResult<()> {
        let Some(job) = self.deps.jobs.find_by_id(user_id, job_id).await? else {
            return self.edit(chat_id, message_id, SEARCH_NOT_FOUND).await;
        };
        let Some(form) = job.form() else {
            return Ok(());
        };

        let url = keyboards::form_url(&self.deps.forms_url, form, user_id, Some(&job.name), true);
        self.deps
            .messenger
            .edit_message(
                chat_id,
                message_id,
                &format!("Please set your preferred appointment date for {}:", job.name),
                Some(keyboards::set_preferred_date(url)),
            )
            .await?;
        Ok(())
    }
}
