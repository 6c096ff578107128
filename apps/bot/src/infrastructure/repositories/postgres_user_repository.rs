use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::repositories::{RepositoryResult, UserRepository};

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new PostgresUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn upsert(&self, user_id: i64) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE
            SET last_interaction = CURRENT_TIMESTAMP
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id, "User upserted");
        Ok(())
    }
}
