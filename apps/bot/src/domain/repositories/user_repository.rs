use async_trait::async_trait;

use super::RepositoryResult;

/// Repository for Telegram users that interacted with the bot
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert the user or refresh its last interaction timestamp
    async fn upsert(&self, user_id: i64) -> RepositoryResult<()>;
}
