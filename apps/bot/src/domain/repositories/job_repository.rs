use async_trait::async_trait;

use super::RepositoryResult;
use crate::domain::job::{SearchJob, ServiceType};

/// Repository for appointment searches
///
/// Every lookup is scoped to the owning user.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Register a new search in `pending_form` status
    async fn add(
        &self,
        user_id: i64,
        name: &str,
        service_type: ServiceType,
    ) -> RepositoryResult<SearchJob>;

    /// Find a search by its name
    async fn find(&self, user_id: i64, name: &str) -> RepositoryResult<Option<SearchJob>>;

    /// Find a search by its row id
    async fn find_by_id(&self, user_id: i64, id: i32) -> RepositoryResult<Option<SearchJob>>;

    /// All searches of a user, oldest first
    async fn list_for_user(&self, user_id: i64) -> RepositoryResult<Vec<SearchJob>>;

    /// All searches whose form was submitted
    async fn list_active(&self) -> RepositoryResult<Vec<SearchJob>>;

    /// Delete a search; returns whether a row was removed
    async fn remove(&self, user_id: i64, name: &str) -> RepositoryResult<bool>;
}
