use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Attempts made to create the schema before giving up
const INIT_ATTEMPTS: u32 = 3;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        user_id BIGINT UNIQUE NOT NULL,
        last_interaction TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_jobs (
        id SERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(user_id),
        job_name TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending_form'
    )
    "#,
    "ALTER TABLE user_jobs ADD COLUMN IF NOT EXISTS service_type TEXT NOT NULL DEFAULT 'menores'",
    r#"
    CREATE TABLE IF NOT EXISTS form_submissions (
        id SERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(user_id),
        volume_page_number TEXT,
        password TEXT,
        child1_identifier TEXT,
        child1_name TEXT,
        child1_birth_date TEXT,
        child2_identifier TEXT,
        child2_name TEXT,
        child2_birth_date TEXT,
        child3_identifier TEXT,
        child3_name TEXT,
        child3_birth_date TEXT,
        job_name TEXT
    )
    "#,
    "ALTER TABLE form_submissions ADD COLUMN IF NOT EXISTS preferred_date TEXT",
    "ALTER TABLE form_submissions ADD COLUMN IF NOT EXISTS submitted_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP",
    "ALTER TABLE form_submissions ADD COLUMN IF NOT EXISTS extra_fields JSONB",
];

/// Rewrites a hosting-provider URL into the form the driver expects
///
/// `postgres://` becomes `postgresql://` and TLS is required unless the
/// URL already carries query parameters.
pub fn normalize_database_url(url: &str) -> String {
    let mut url = match url.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{}", rest),
        None => url.to_string(),
    };
    if !url.contains('?') {
        url.push_str("?sslmode=require");
    }
    url
}

/// Opens the connection pool
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .test_before_acquire(true)
        .connect(&normalize_database_url(database_url))
        .await
}

/// Creates all tables, retrying transient failures
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut attempt = 1;
    loop {
        match create_tables(pool).await {
            Ok(()) => {
                tracing::info!("Database tables created or already exist");
                return Ok(());
            }
            Err(e) if attempt < INIT_ATTEMPTS => {
                tracing::error!(attempt, error = %e, "Database initialization attempt failed");
                attempt += 1;
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize database after multiple attempts");
                return Err(e);
            }
        }
    }
}

async fn create_tables(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await
}
