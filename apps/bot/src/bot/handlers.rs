use super::keyboards;
use super::{Bot, BotResult};
use crate::domain::dates::{is_preferred_date_format, parse_preferred_date};
use crate::domain::job::{ServiceOption, MAX_JOBS_PER_USER};
use crate::infrastructure::telegram::Message;

const GREETING: &str = "Hello! I'm your appointment bot 🤖!";
const NAME_PROMPT: &str = "Please provide a name for this appointment (e.g., 'John' or 'Maria'):";
const UNKNOWN_OPTION: &str =
    "Sorry, I don't understand that option. Please select from the available choices.";

impl Bot {
    pub(crate) async fn handle_message(&self, message: Message) -> BotResult<()> {
        let Some(text) = message.text.as_deref().map(str::trim) else {
            return Ok(());
        };
        let chat_id = message.chat.id;
        let user_id = message.from.as_ref().map_or(chat_id, |u| u.id);

        if text == "/start" || text.starts_with("/start ") {
            return self.start(chat_id, user_id).await;
        }
        // Leaves any pending naming step
        if text == keyboards::CANCEL {
            self.sessions.update(user_id, |s| s.pending_option = None);
            return self
                .reply_with_menu(chat_id, user_id, "Returning to main menu")
                .await;
        }
        if is_preferred_date_format(text) {
            return self.preferred_date(chat_id, user_id, text).await;
        }

        match text {
            keyboards::REGISTRATION_FORMS => self.registration_forms(chat_id, user_id).await,
            keyboards::CANCEL_SEARCH => self.list_for_cancel(chat_id, user_id).await,
            keyboards::CHECK_SEARCHES => self.list_for_check(chat_id, user_id).await,
            keyboards::SEARCH_NEW => {
                self.reply(
                    chat_id,
                    "Please choose one of the following options:",
                    Some(keyboards::service_options().into()),
                )
                .await?;
                Ok(())
            }
            _ => match ServiceOption::from_label(text) {
                Some(ServiceOption::MenoresGeneral) => {
                    self.reply(
                        chat_id,
                        "Please select the number of children:",
                        Some(keyboards::children_options().into()),
                    )
                    .await?;
                    Ok(())
                }
                Some(option) => {
                    self.sessions
                        .update(user_id, |s| s.pending_option = Some(option));
                    self.reply(chat_id, NAME_PROMPT, None).await.map(|_| ())
                }
                None => {
                    if let Some(option) = self.sessions.get(user_id).pending_option {
                        self.name_search(chat_id, user_id, option, text).await
                    } else {
                        self.reply_with_menu(chat_id, user_id, UNKNOWN_OPTION).await
                    }
                }
            },
        }
    }

    async fn start(&self, chat_id: i64, user_id: i64) -> BotResult<()> {
        self.deps.users.upsert(user_id).await?;
        self.reply_with_menu(chat_id, user_id, GREETING).await
    }

    async fn registration_forms(&self, chat_id: i64, user_id: i64) -> BotResult<()> {
        let job_name = self.sessions.get(user_id).pending_job_name;
        let forms = keyboards::registration_forms(&self.deps.forms_url, chat_id, job_name.as_deref());
        self.reply(
            chat_id,
            "Please select the registration form you need:",
            Some(forms.into()),
        )
        .await?;
        self.reply_with_menu(chat_id, user_id, "You can also choose from these options:")
            .await
    }

    async fn list_for_cancel(&self, chat_id: i64, user_id: i64) -> BotResult<()> {
        let jobs = self.deps.jobs.list_for_user(user_id).await?;
        if jobs.is_empty() {
            return self
                .reply_with_menu(chat_id, user_id, "No active searches to cancel.")
                .await;
        }
        let buttons =
            keyboards::job_buttons(&jobs, "cancel_", Some(("Cancel all appointments", "cancel_all")));
        self.reply(chat_id, "Select the appointment to cancel:", Some(buttons.into()))
            .await?;
        Ok(())
    }

    async fn list_for_check(&self, chat_id: i64, user_id: i64) -> BotResult<()> {
        let jobs = self.deps.jobs.list_for_user(user_id).await?;
        if jobs.is_empty() {
            return self
                .reply_with_menu(chat_id, user_id, "No active searches to check.")
                .await;
        }
        let buttons =
            keyboards::job_buttons(&jobs, "check_", Some(("Check all appointments", "check_all")));
        self.reply(chat_id, "Select an appointment to check:", Some(buttons.into()))
            .await?;
        Ok(())
    }

    /// Turns the typed name into a new search waiting for its form
    async fn name_search(
        &self,
        chat_id: i64,
        user_id: i64,
        option: ServiceOption,
        name: &str,
    ) -> BotResult<()> {
        let job_name = option.job_name(name);
        self.sessions
            .update(user_id, |s| s.pending_job_name = Some(job_name.clone()));

        let jobs = self.deps.jobs.list_for_user(user_id).await?;
        if jobs.iter().any(|job| job.has_name(&job_name)) {
            // Stay in the naming step
            self.reply(
                chat_id,
                &format!("The name '{}' is already in use. Please choose another name.", name),
                None,
            )
            .await?;
            return Ok(());
        }

        if jobs.len() >= MAX_JOBS_PER_USER {
            self.sessions.update(user_id, |s| s.pending_option = None);
            return self
                .reply_with_menu(
                    chat_id,
                    user_id,
                    &format!(
                        "You have reached the maximum number of active searches ({}).",
                        MAX_JOBS_PER_USER
                    ),
                )
                .await;
        }

        let job = match self
            .deps
            .jobs
            .add(user_id, &job_name, option.service_type())
            .await
        {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(user_id, job = %job_name, error = %e, "Failed to create job");
                return self
                    .reply_with_menu(chat_id, user_id, "Failed to create job. Please try again.")
                    .await;
            }
        };
        tracing::info!(user_id, job = %job.name, "Search created, waiting for form");

        self.reply(chat_id, &format!("Name '{}' accepted.", job.name), None)
            .await?;
        if let Some(form) = job.form() {
            let url = keyboards::form_url(&self.deps.forms_url, form, chat_id, Some(&job.name), false);
            self.reply(
                chat_id,
                "Please fill out the registration form to start searching for appointments:",
                Some(keyboards::fill_form(url).into()),
            )
            .await?;
        }
        self.reply_with_menu(
            chat_id,
            user_id,
            "Your appointment search will begin automatically after you submit the registration form.",
        )
        .await?;

        self.sessions.update(user_id, |s| s.pending_option = None);
        Ok(())
    }

    async fn preferred_date(&self, chat_id: i64, user_id: i64, text: &str) -> BotResult<()> {
        if parse_preferred_date(text).is_none() {
            self.reply(
                chat_id,
                "Please provide your preferred date in format DD/MM/YYYY (e.g., 15/04/2025)",
                None,
            )
            .await?;
            return Ok(());
        }

        let jobs = self.deps.jobs.list_for_user(user_id).await?;
        match jobs.as_slice() {
            [] => {
                self.reply_with_menu(
                    chat_id,
                    user_id,
                    "You don't have any active appointment searches. Please start a new search first.",
                )
                .await
            }
            [job] => {
                let reply = match self
                    .deps
                    .submissions
                    .set_preferred_date(user_id, &job.name, text)
                    .await
                {
                    Ok(()) => preferred_date_updated(&job.name, text),
                    Err(e) => {
                        tracing::error!(user_id, job = %job.name, error = %e, "Failed to update preferred date");
                        "Failed to update preferred date. Please try again later.".to_string()
                    }
                };
                self.reply_with_menu(chat_id, user_id, &reply).await
            }
            _ => {
                self.sessions
                    .update(user_id, |s| s.pending_preferred_date = Some(text.to_string()));
                let buttons = keyboards::job_buttons(&jobs, "date_", None);
                self.reply(
                    chat_id,
                    "Please select which appointment to update with this preferred date:",
                    Some(buttons.into()),
                )
                .await?;
                Ok(())
            }
        }
    }
}

pub(crate) fn preferred_date_updated(job_name: &str, date: &str) -> String {
    format!(
        "Preferred date for {} updated to {}. I'll try to book this date when it becomes available.",
        job_name, date
    )
}
