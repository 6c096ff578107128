use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::job::{JobStatus, SearchJob, ServiceType};
use crate::domain::repositories::{JobRepository, RepositoryError, RepositoryResult};

/// PostgreSQL implementation of JobRepository backed by `user_jobs`
#[derive(Clone)]
pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i32,
    user_id: i64,
    job_name: String,
    status: String,
    service_type: String,
}

impl TryFrom<JobRow> for SearchJob {
    type Error = RepositoryError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|message| RepositoryError::InvalidData {
                table: "user_jobs",
                column: "status",
                message,
            })?;
        let service_type =
            row.service_type
                .parse::<ServiceType>()
                .map_err(|message| RepositoryError::InvalidData {
                    table: "user_jobs",
                    column: "service_type",
                    message,
                })?;

        Ok(SearchJob {
            id: row.id,
            user_id: row.user_id,
            name: row.job_name,
            status,
            service_type,
        })
    }
}

fn into_jobs(rows: Vec<JobRow>) -> RepositoryResult<Vec<SearchJob>> {
    rows.into_iter().map(SearchJob::try_from).collect()
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    async fn add(
        &self,
        user_id: i64,
        name: &str,
        service_type: ServiceType,
    ) -> RepositoryResult<SearchJob> {
        let mut tx = self.pool.begin().await?;

        // user_jobs references users, so the owner must exist first
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO user_jobs (user_id, job_name, status, service_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, job_name, status, service_type
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(JobStatus::PendingForm.as_str())
        .bind(service_type.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id, job = name, "Job added with pending_form status");
        row.try_into()
    }

    async fn find(&self, user_id: i64, name: &str) -> RepositoryResult<Option<SearchJob>> {
        sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, user_id, job_name, status, service_type
            FROM user_jobs
            WHERE user_id = $1 AND job_name = $2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .map(SearchJob::try_from)
        .transpose()
    }

    async fn find_by_id(&self, user_id: i64, id: i32) -> RepositoryResult<Option<SearchJob>> {
        sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, user_id, job_name, status, service_type
            FROM user_jobs
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(SearchJob::try_from)
        .transpose()
    }

    async fn list_for_user(&self, user_id: i64) -> RepositoryResult<Vec<SearchJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, user_id, job_name, status, service_type
            FROM user_jobs
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_jobs(rows)
    }

    async fn list_active(&self) -> RepositoryResult<Vec<SearchJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, user_id, job_name, status, service_type
            FROM user_jobs
            WHERE status = $1
            ORDER BY id
            "#,
        )
        .bind(JobStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = rows.len(), "Active jobs retrieved");
        into_jobs(rows)
    }

    async fn remove(&self, user_id: i64, name: &str) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM user_jobs WHERE user_id = $1 AND job_name = $2")
            .bind(user_id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id, job = name, "Job removed");
        Ok(result.rows_affected() > 0)
    }
}
