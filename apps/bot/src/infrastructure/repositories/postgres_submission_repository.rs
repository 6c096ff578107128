use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::job::JobStatus;
use crate::domain::repositories::{RepositoryResult, SubmissionRepository};
use crate::domain::submission::FormSubmission;

/// PostgreSQL implementation of SubmissionRepository backed by `form_submissions`
#[derive(Clone)]
pub struct PostgresSubmissionRepository {
    pool: PgPool,
}

impl PostgresSubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for PostgresSubmissionRepository {
    async fn save(&self, submission: &FormSubmission) -> RepositoryResult<()> {
        let [child1, child2, child3] = &submission.children;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO form_submissions (
                user_id, volume_page_number, password,
                child1_identifier, child1_name, child1_birth_date,
                child2_identifier, child2_name, child2_birth_date,
                child3_identifier, child3_name, child3_birth_date,
                job_name, preferred_date, extra_fields
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(submission.user_id)
        .bind(&submission.volume_page_number)
        .bind(&submission.password)
        .bind(&child1.identifier)
        .bind(&child1.name)
        .bind(&child1.birth_date)
        .bind(&child2.identifier)
        .bind(&child2.name)
        .bind(&child2.birth_date)
        .bind(&child3.identifier)
        .bind(&child3.name)
        .bind(&child3.birth_date)
        .bind(&submission.job_name)
        .bind(&submission.preferred_date)
        .bind(Json(&submission.extra))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE user_jobs
            SET status = $3
            WHERE user_id = $1 AND job_name = $2
            "#,
        )
        .bind(submission.user_id)
        .bind(&submission.job_name)
        .bind(JobStatus::Active.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = submission.user_id,
            job = %submission.job_name,
            "Form submission saved"
        );
        Ok(())
    }

    async fn latest_preferred_date(
        &self,
        user_id: i64,
        job_name: &str,
    ) -> RepositoryResult<Option<String>> {
        let date: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT preferred_date
            FROM form_submissions
            WHERE user_id = $1 AND job_name = $2
            ORDER BY submitted_at DESC NULLS LAST, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(job_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(date.flatten().filter(|d| !d.is_empty()))
    }

    async fn set_preferred_date(
        &self,
        user_id: i64,
        job_name: &str,
        preferred_date: &str,
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE form_submissions
            SET preferred_date = $3
            WHERE user_id = $1 AND job_name = $2
            "#,
        )
        .bind(user_id)
        .bind(job_name)
        .bind(preferred_date)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO form_submissions (user_id, job_name, preferred_date)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(user_id)
            .bind(job_name)
            .bind(preferred_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(user_id, job = job_name, "Preferred date updated");
        Ok(())
    }
}
