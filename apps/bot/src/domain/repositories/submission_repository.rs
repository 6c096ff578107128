use async_trait::async_trait;

use super::RepositoryResult;
use crate::domain::submission::FormSubmission;

/// Repository for registration form submissions
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Store a submission and mark its search `active`, atomically
    async fn save(&self, submission: &FormSubmission) -> RepositoryResult<()>;

    /// Preferred date of the most recent submission for a search
    async fn latest_preferred_date(
        &self,
        user_id: i64,
        job_name: &str,
    ) -> RepositoryResult<Option<String>>;

    /// Set the preferred date of a search, creating a minimal submission if none exists
    async fn set_preferred_date(
        &self,
        user_id: i64,
        job_name: &str,
        preferred_date: &str,
    ) -> RepositoryResult<()>;
}
