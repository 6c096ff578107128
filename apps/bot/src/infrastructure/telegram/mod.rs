// Telegram Bot API adapter
// The `Messenger` trait is the port the bot, the watcher and the HTTP layer talk to

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::TelegramClient;
pub use types::{
    CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message, ReplyKeyboardMarkup,
    ReplyMarkup, Update, User,
};

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram {method} failed ({code:?}): {description}")]
    Api {
        method: String,
        code: Option<i64>,
        description: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type TelegramResult<T> = Result<T, TelegramError>;

/// Outgoing side of the bot
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a message, optionally with a reply or inline keyboard
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> TelegramResult<Message>;

    /// Replace the text (and inline keyboard) of a message sent earlier
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> TelegramResult<()>;

    /// Acknowledge an inline button press
    async fn answer_callback(&self, callback_id: &str) -> TelegramResult<()>;
}
