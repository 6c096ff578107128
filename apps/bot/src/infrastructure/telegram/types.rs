use serde::{Deserialize, Serialize};

/// Incoming update from `getUpdates`
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
}

/// Press of an inline keyboard button
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

/// Custom keyboard replacing the user's text keyboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

impl ReplyKeyboardMarkup {
    /// One button per row
    pub fn single_column<I, S>(labels: I, one_time: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keyboard: labels
                .into_iter()
                .map(|label| vec![KeyboardButton { text: label.into() }])
                .collect(),
            resize_keyboard: true,
            one_time_keyboard: one_time,
        }
    }

    /// Labels of all buttons, row by row
    pub fn labels(&self) -> Vec<&str> {
        self.keyboard
            .iter()
            .flatten()
            .map(|button| button.text.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl InlineKeyboardButton {
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
        }
    }

    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
        }
    }
}

/// Keyboard attached under a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row
    pub fn single_column(buttons: impl IntoIterator<Item = InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|button| vec![button]).collect(),
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineKeyboardButton> {
        self.inline_keyboard.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Inline(InlineKeyboardMarkup),
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
    fn from(markup: ReplyKeyboardMarkup) -> Self {
        ReplyMarkup::Keyboard(markup)
    }
}

impl From<InlineKeyboardMarkup> for ReplyMarkup {
    fn from(markup: InlineKeyboardMarkup) -> Self {
        ReplyMarkup::Inline(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_keyboard_serializes_like_bot_api() {
        let markup: ReplyMarkup = ReplyKeyboardMarkup::single_column(["A", "B"], true).into();
        assert_eq!(
            serde_json::to_value(&markup).unwrap(),
            json!({
                "keyboard": [[{"text": "A"}], [{"text": "B"}]],
                "resize_keyboard": true,
                "one_time_keyboard": true
            })
        );
    }

    #[test]
    fn inline_buttons_omit_unused_fields() {
        let markup: ReplyMarkup = InlineKeyboardMarkup::single_column([
            InlineKeyboardButton::link("Form", "https://example.com"),
            InlineKeyboardButton::callback("Cancel", "cancel_all"),
        ])
        .into();
        assert_eq!(
            serde_json::to_value(&markup).unwrap(),
            json!({
                "inline_keyboard": [
                    [{"text": "Form", "url": "https://example.com"}],
                    [{"text": "Cancel", "callback_data": "cancel_all"}]
                ]
            })
        );
    }

    #[test]
    fn parses_callback_update() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 7, "is_bot": false, "first_name": "Ana"},
                "message": {"message_id": 3, "chat": {"id": 7, "type": "private"}, "date": 0},
                "data": "cancel_all"
            }
        }))
        .unwrap();

        let query = update.callback_query.unwrap();
        assert_eq!(query.from.id, 7);
        assert_eq!(query.data.as_deref(), Some("cancel_all"));
        assert_eq!(query.message.unwrap().message_id, 3);
        assert!(update.message.is_none());
    }
}
