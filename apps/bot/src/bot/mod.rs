// Telegram conversation
//
// Updates arrive through the long-polling loop in `poller`; each one is
// routed to a message or callback handler.

pub mod callbacks;
pub mod handlers;
pub mod keyboards;
pub mod poller;
pub mod session;

use std::sync::Arc;

use thiserror::Error;

use crate::appointments::AppointmentChecker;
use crate::domain::repositories::{
    JobRepository, RepositoryError, SubmissionRepository, UserRepository,
};
use crate::infrastructure::error_reporter::{user_friendly_message, ErrorReport, ErrorReporter};
use crate::infrastructure::telegram::{
    Messenger, ReplyKeyboardMarkup, ReplyMarkup, TelegramError, Update,
};
use crate::searches::SearchService;

pub use session::{Session, Sessions};

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

pub type BotResult<T> = Result<T, BotError>;

/// Collaborators of the conversation handlers
pub struct BotDeps {
    pub users: Arc<dyn UserRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub messenger: Arc<dyn Messenger>,
    pub checker: Arc<dyn AppointmentChecker>,
    pub searches: SearchService,
    pub reporter: ErrorReporter,
    /// Base URL of the hosted registration forms
    pub forms_url: String,
}

pub struct Bot {
    deps: BotDeps,
    sessions: Sessions,
}

impl Bot {
    pub fn new(deps: BotDeps) -> Self {
        Self {
            deps,
            sessions: Sessions::new(),
        }
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Routes one update; failures are logged and reported, never propagated
    ///
    /// The user only ever sees a generic apology for a failure.
    pub async fn handle_update(&self, update: Update) {
        let (user_id, chat_id, result) = if let Some(message) = update.message {
            let chat_id = message.chat.id;
            let user_id = message.from.as_ref().map_or(chat_id, |u| u.id);
            (user_id, chat_id, self.handle_message(message).await)
        } else if let Some(query) = update.callback_query {
            let chat_id = query.message.as_ref().map_or(query.from.id, |m| m.chat.id);
            (query.from.id, chat_id, self.handle_callback(query).await)
        } else {
            return;
        };

        if let Err(e) = result {
            tracing::error!(user_id, update_id = update.update_id, error = %e, "Failed to handle update");
            self.deps
                .reporter
                .report(
                    ErrorReport::new(user_id, "Failed to handle update")
                        .info("update_id", update.update_id)
                        .details(e.to_string()),
                )
                .await;
            if let Err(e) = self
                .deps
                .messenger
                .send_message(chat_id, user_friendly_message(None), None)
                .await
            {
                tracing::error!(user_id, error = %e, "Failed to send apology");
            }
        }
    }

    async fn main_menu(&self, user_id: i64) -> ReplyKeyboardMarkup {
        keyboards::main_menu_for(self.deps.jobs.as_ref(), user_id).await
    }

    async fn reply(&self, chat_id: i64, text: &str, markup: Option<ReplyMarkup>) -> BotResult<i64> {
        let sent = self.deps.messenger.send_message(chat_id, text, markup).await?;
        Ok(sent.message_id)
    }

    async fn reply_with_menu(&self, chat_id: i64, user_id: i64, text: &str) -> BotResult<()> {
        let menu = self.main_menu(user_id).await;
        self.reply(chat_id, text, Some(menu.into())).await.map(|_| ())
    }
}
