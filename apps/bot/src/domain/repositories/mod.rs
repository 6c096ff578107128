// Repository interfaces (ports)
// Implemented by the infrastructure layer

pub mod job_repository;
pub mod submission_repository;
pub mod user_repository;

use thiserror::Error;

pub use job_repository::JobRepository;
pub use submission_repository::SubmissionRepository;
pub use user_repository::UserRepository;

/// Errors raised by repository implementations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid {column} stored for {table}: {message}")]
    InvalidData {
        table: &'static str,
        column: &'static str,
        message: String,
    },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
