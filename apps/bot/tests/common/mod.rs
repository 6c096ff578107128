//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use appointment_bot::appointments::{AppointmentChecker, CheckError, CheckResult};
use appointment_bot::domain::dates::AvailableDates;
use appointment_bot::domain::job::{JobStatus, SearchJob, ServiceOption, ServiceType};
use appointment_bot::domain::repositories::{
    JobRepository, RepositoryError, RepositoryResult, SubmissionRepository, UserRepository,
};
use appointment_bot::domain::submission::FormSubmission;
use appointment_bot::infrastructure::telegram::{
    Chat, InlineKeyboardMarkup, Message, Messenger, ReplyMarkup, TelegramResult,
};
use async_trait::async_trait;

#[derive(Default)]
struct StoreState {
    users: HashSet<i64>,
    jobs: Vec<SearchJob>,
    submissions: Vec<FormSubmission>,
    next_id: i32,
}

/// Repositories kept in memory, mirroring the PostgreSQL behaviour
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    failing_saves: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inserts a search directly, bypassing the conversation
    pub fn insert_job(&self, user_id: i64, name: &str, service_type: ServiceType, status: JobStatus) -> SearchJob {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.users.insert(user_id);
        let job = SearchJob {
            id: state.next_id,
            user_id,
            name: name.to_string(),
            status,
            service_type,
        };
        state.jobs.push(job.clone());
        job
    }

    pub fn jobs(&self) -> Vec<SearchJob> {
        self.state.lock().unwrap().jobs.clone()
    }

    pub fn submissions(&self) -> Vec<FormSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn has_user(&self, user_id: i64) -> bool {
        self.state.lock().unwrap().users.contains(&user_id)
    }

    /// Makes every following `save` fail
    pub fn fail_saves(&self) {
        *self.failing_saves.lock().unwrap() = true;
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn upsert(&self, user_id: i64) -> RepositoryResult<()> {
        self.state.lock().unwrap().users.insert(user_id);
        Ok(())
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn add(&self, user_id: i64, name: &str, service_type: ServiceType) -> RepositoryResult<SearchJob> {
        Ok(self.insert_job(user_id, name, service_type, JobStatus::PendingForm))
    }

    async fn find(&self, user_id: i64, name: &str) -> RepositoryResult<Option<SearchJob>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .iter()
            .find(|job| job.user_id == user_id && job.name == name)
            .cloned())
    }

    async fn find_by_id(&self, user_id: i64, id: i32) -> RepositoryResult<Option<SearchJob>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .iter()
            .find(|job| job.user_id == user_id && job.id == id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> RepositoryResult<Vec<SearchJob>> {
        let state = self.state.lock().unwrap();
        Ok(state.jobs.iter().filter(|job| job.user_id == user_id).cloned().collect())
    }

    async fn list_active(&self) -> RepositoryResult<Vec<SearchJob>> {
        let state = self.state.lock().unwrap();
        Ok(state.jobs.iter().filter(|job| job.is_active()).cloned().collect())
    }

    async fn remove(&self, user_id: i64, name: &str) -> RepositoryResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.jobs.len();
        state.jobs.retain(|job| !(job.user_id == user_id && job.name == name));
        Ok(state.jobs.len() != before)
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryStore {
    async fn save(&self, submission: &FormSubmission) -> RepositoryResult<()> {
        if *self.failing_saves.lock().unwrap() {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().unwrap();
        state.submissions.push(submission.clone());
        for job in state
            .jobs
            .iter_mut()
            .filter(|job| job.user_id == submission.user_id && job.name == submission.job_name)
        {
            job.status = JobStatus::Active;
        }
        Ok(())
    }

    async fn latest_preferred_date(&self, user_id: i64, job_name: &str) -> RepositoryResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .submissions
            .iter()
            .rev()
            .find(|s| s.user_id == user_id && s.job_name == job_name)
            .and_then(|s| s.preferred_date.clone()))
    }

    async fn set_preferred_date(&self, user_id: i64, job_name: &str, preferred_date: &str) -> RepositoryResult<()> {
        let mut state = self.state.lock().unwrap();
        let mut updated = false;
        for submission in state
            .submissions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.job_name == job_name)
        {
            submission.preferred_date = Some(preferred_date.to_string());
            updated = true;
        }
        if !updated {
            state.submissions.push(FormSubmission {
                user_id,
                job_name: job_name.to_string(),
                volume_page_number: None,
                password: None,
                children: Default::default(),
                preferred_date: Some(preferred_date.to_string()),
                extra: Default::default(),
            });
        }
        Ok(())
    }
}

/// Something the bot sent to Telegram
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message {
        chat_id: i64,
        message_id: i64,
        text: String,
        markup: Option<ReplyMarkup>,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    },
    Answer(String),
}

impl Sent {
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Message { text, .. } | Sent::Edit { text, .. } => Some(text),
            Sent::Answer(_) => None,
        }
    }
}

/// Messenger that records every call and hands out increasing message ids
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    next_message_id: AtomicI64,
    send_delay: Option<Duration>,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every `send_message` takes `delay` before it is recorded
    pub fn with_send_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            send_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of sent messages and edits, in order
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|s| s.text().map(str::to_string))
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn has_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|text| text.contains(needle))
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Waits for a background task to send a message containing `needle`
    pub async fn wait_for_text(&self, needle: &str) -> bool {
        for _ in 0..200 {
            if self.has_text(needle) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, chat_id: i64, text: &str, markup: Option<ReplyMarkup>) -> TelegramResult<Message> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().unwrap().push(Sent::Message {
            chat_id,
            message_id,
            text: text.to_string(),
            markup,
        });
        Ok(Message {
            message_id,
            chat: Chat { id: chat_id },
            from: None,
            text: Some(text.to_string()),
        })
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> TelegramResult<()> {
        self.sent.lock().unwrap().push(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            markup,
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> TelegramResult<()> {
        self.sent.lock().unwrap().push(Sent::Answer(callback_id.to_string()));
        Ok(())
    }
}

/// What the stub answers for one check
#[derive(Debug, Clone)]
pub enum StubOutcome {
    Dates(AvailableDates),
    Exhausted,
    /// Never answers, so the caller's timeout fires
    Hang,
}

/// Appointment checker answering from a queue; the last outcome repeats
pub struct StubChecker {
    outcomes: Mutex<VecDeque<StubOutcome>>,
    calls: Mutex<Vec<(ServiceOption, Option<String>, u32)>>,
}

impl StubChecker {
    pub fn new(outcomes: impl IntoIterator<Item = StubOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn no_dates() -> Arc<Self> {
        Self::new([StubOutcome::Dates(AvailableDates::Listed(Vec::new()))])
    }

    pub fn calls(&self) -> Vec<(ServiceOption, Option<String>, u32)> {
        self.calls.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> StubOutcome {
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            outcomes.pop_front().unwrap()
        } else {
            outcomes
                .front()
                .cloned()
                .unwrap_or(StubOutcome::Dates(AvailableDates::Listed(Vec::new())))
        }
    }
}

#[async_trait]
impl AppointmentChecker for StubChecker {
    async fn check(
        &self,
        option: ServiceOption,
        preferred_date: Option<&str>,
        max_attempts: u32,
    ) -> CheckResult<AvailableDates> {
        self.calls
            .lock()
            .unwrap()
            .push((option, preferred_date.map(str::to_string), max_attempts));
        match self.next_outcome() {
            StubOutcome::Dates(dates) => Ok(dates),
            StubOutcome::Exhausted => Err(CheckError::Exhausted(max_attempts)),
            StubOutcome::Hang => std::future::pending().await,
        }
    }
}
