// Repository implementations (data access layer)
// Adapters that implement domain repository interfaces

pub mod postgres_job_repository;
pub mod postgres_submission_repository;
pub mod postgres_user_repository;

pub use postgres_job_repository::PostgresJobRepository;
pub use postgres_submission_repository::PostgresSubmissionRepository;
pub use postgres_user_repository::PostgresUserRepository;
