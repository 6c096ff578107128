use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::types::{InlineKeyboardMarkup, Message, ReplyMarkup, Update};
use super::{Messenger, TelegramError, TelegramResult};

/// Seconds a `getUpdates` call may hang waiting for new updates
pub const LONG_POLL_SECS: u64 = 30;

/// Envelope every Bot API method answers with
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

/// Thin client for the Telegram Bot API
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    endpoint: String,
}

impl TelegramClient {
    /// `api_url` is the Bot API root, e.g. `https://api.telegram.org`
    pub fn new(api_url: &str, token: &str) -> TelegramResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<P, R>(&self, method: &str, payload: &P) -> TelegramResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response: ApiResponse<R> = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .json(payload)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description,
                error_code,
                ..
            } => Err(TelegramError::Api {
                method: method.to_string(),
                code: error_code,
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    /// Long-polls for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>) -> TelegramResult<Vec<Update>> {
        let mut payload = json!({
            "timeout": LONG_POLL_SECS,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call("getUpdates", &payload).await
    }

    /// Sends a Markdown formatted message to a chat given by id or `@username`
    pub async fn send_markdown(&self, chat: &str, text: &str) -> TelegramResult<Message> {
        self.call(
            "sendMessage",
            &json!({
                "chat_id": chat,
                "text": text,
                "parse_mode": "Markdown",
            }),
        )
        .await
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> TelegramResult<Message> {
        let mut payload = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        self.call("sendMessage", &payload).await
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> TelegramResult<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }

        // Result is the edited Message, or `true` for inline messages
        match self.call::<_, serde_json::Value>("editMessageText", &payload).await {
            Ok(_) => Ok(()),
            Err(TelegramError::Api { description, .. })
                if description.contains("message is not modified") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn answer_callback(&self, callback_id: &str) -> TelegramResult<()> {
        self.call::<_, bool>(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_id }),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::telegram::types::ReplyKeyboardMarkup;
    use httpmock::prelude::*;

    fn message_json(id: i64) -> serde_json::Value {
        json!({
            "ok": true,
            "result": {"message_id": id, "chat": {"id": 5, "type": "private"}, "date": 0, "text": "hi"}
        })
    }

    #[tokio::test]
    async fn send_message_posts_text_and_keyboard() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botTOKEN/sendMessage")
                    .json_body(json!({
                        "chat_id": 5,
                        "text": "hello",
                        "reply_markup": {
                            "keyboard": [[{"text": "A"}]],
                            "resize_keyboard": true,
                            "one_time_keyboard": false
                        }
                    }));
                then.status(200).json_body(message_json(77));
            })
            .await;

        let client = TelegramClient::new(&server.base_url(), "TOKEN").unwrap();
        let markup = ReplyKeyboardMarkup::single_column(["A"], false);
        let sent = client
            .send_message(5, "hello", Some(markup.into()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(sent.message_id, 77);
    }

    #[tokio::test]
    async fn api_errors_carry_description() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/botTOKEN/sendMessage");
                then.status(400).json_body(json!({
                    "ok": false,
                    "error_code": 400,
                    "description": "Bad Request: chat not found"
                }));
            })
            .await;

        let client = TelegramClient::new(&server.base_url(), "TOKEN").unwrap();
        let err = client.send_message(1, "x", None).await.unwrap_err();

        match err {
            TelegramError::Api { code, description, .. } => {
                assert_eq!(code, Some(400));
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unchanged_edit_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/botTOKEN/editMessageText");
                then.status(400).json_body(json!({
                    "ok": false,
                    "error_code": 400,
                    "description": "Bad Request: message is not modified"
                }));
            })
            .await;

        let client = TelegramClient::new(&server.base_url(), "TOKEN").unwrap();
        assert!(client.edit_message(1, 2, "same", None).await.is_ok());
    }

    #[tokio::test]
    async fn get_updates_sends_offset() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botTOKEN/getUpdates")
                    .json_body_partial(r#"{"offset": 11, "timeout": 30}"#);
                then.status(200).json_body(json!({
                    "ok": true,
                    "result": [{
                        "update_id": 11,
                        "message": {"message_id": 1, "chat": {"id": 9}, "from": {"id": 9, "first_name": "A"}, "text": "/start"}
                    }]
                }));
            })
            .await;

        let client = TelegramClient::new(&server.base_url(), "TOKEN").unwrap();
        let updates = client.get_updates(Some(11)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/start"));
    }
}
