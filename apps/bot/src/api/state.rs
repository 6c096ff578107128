use std::sync::Arc;
use std::time::Duration;

use crate::domain::repositories::{JobRepository, SubmissionRepository, UserRepository};
use crate::infrastructure::error_reporter::ErrorReporter;
use crate::infrastructure::telegram::Messenger;
use crate::searches::SearchService;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub messenger: Arc<dyn Messenger>,
    /// Present only when this process runs the searches
    pub searches: Option<SearchService>,
    pub reporter: ErrorReporter,
    /// Budget of the background save of a form submission
    pub save_timeout: Duration,
}
