//! Operational error reports for the maintainers.
//!
//! Errors are posted to a monitoring chat through a separate bot so users
//! only ever see a generic apology.

use chrono::{DateTime, Local};

use crate::domain::job::ServiceType;
use crate::infrastructure::telegram::TelegramClient;

/// Longest details block kept in a report; Telegram caps messages near 4096 chars
pub const MAX_DETAILS_LEN: usize = 3500;

/// Context attached to one error report
#[derive(Debug, Clone)]
pub struct ErrorReport {
    user_id: i64,
    error: String,
    job: Option<String>,
    info: Vec<(String, String)>,
    details: Option<String>,
}

impl ErrorReport {
    pub fn new(user_id: i64, error: impl Into<String>) -> Self {
        Self {
            user_id,
            error: error.into(),
            job: None,
            info: Vec::new(),
            details: None,
        }
    }

    pub fn job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    pub fn info(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.info.push((key.into(), value.to_string()));
        self
    }

    /// Debug representation of the failure, shown in a code block
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Markdown body of the report
    pub fn render(&self, now: DateTime<Local>) -> String {
        let mut message = String::from("🚨 *ERROR REPORT* 🚨\n");
        message.push_str(&format!("👤 *User ID*: `{}`\n", self.user_id));
        if let Some(job) = &self.job {
            message.push_str(&format!("🔧 *Job*: `{}`\n", job));
        }
        message.push_str(&format!("⏰ *Time*: `{}`\n", now.format("%Y-%m-%d %H:%M:%S")));
        message.push_str(&format!("❌ *Error*: `{}`\n\n", self.error));

        if !self.info.is_empty() {
            message.push_str("📋 *Additional Info*:\n");
            for (key, value) in &self.info {
                message.push_str(&format!("- {}: {}\n", key, value));
            }
            message.push('\n');
        }

        let details = self
            .details
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("No details available");
        message.push_str(&format!("📊 *Details*:\n```\n{}\n```", truncate(details)));
        message
    }
}

fn truncate(details: &str) -> String {
    if details.chars().count() <= MAX_DETAILS_LEN {
        return details.to_string();
    }
    let kept: String = details.chars().take(MAX_DETAILS_LEN).collect();
    format!("{}...[truncated]", kept)
}

/// Sends error reports to the monitoring chat
#[derive(Clone)]
pub struct ErrorReporter {
    channel: Option<(TelegramClient, String)>,
}

impl ErrorReporter {
    /// Monitoring is enabled only when both the bot token and chat id are set
    pub fn new(api_url: &str, token: Option<&str>, chat_id: Option<&str>) -> Self {
        let channel = match (token, chat_id) {
            (Some(token), Some(chat_id)) => match TelegramClient::new(api_url, token) {
                Ok(client) => Some((client, chat_id.to_string())),
                Err(e) => {
                    tracing::error!(error = %e, "Could not build error monitoring client");
                    None
                }
            },
            _ => None,
        };
        if channel.is_none() {
            tracing::warn!("ERROR_BOT_TOKEN or ERROR_CHAT_ID not set. Error monitoring is disabled.");
        }
        Self { channel }
    }

    pub fn disabled() -> Self {
        Self { channel: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    /// Posts the report; returns whether it was delivered
    pub async fn report(&self, report: ErrorReport) -> bool {
        let Some((client, chat_id)) = &self.channel else {
            tracing::debug!(error = %report.error, "Error monitoring disabled, report dropped");
            return false;
        };

        match client.send_markdown(chat_id, &report.render(Local::now())).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to send error to monitoring bot");
                false
            }
        }
    }
}

/// Generic apology shown to a user when a check fails
pub fn user_friendly_message(service: Option<ServiceType>) -> &'static str {
    match service {
        Some(ServiceType::Menores) => {
            "I'm having trouble checking appointment availability for Menores Ley 36 right now. Please try again later."
        }
        Some(ServiceType::Certificate) => {
            "I'm having trouble checking certificate appointment availability right now. Please try again later."
        }
        None => "I encountered a temporary issue while processing your request. Please try again later.",
    }
}
