use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while checking availability
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Failed to check appointments after {0} attempts")]
    Exhausted(u32),

    #[error("Appointment check timed out after {0:?}")]
    TimedOut(Duration),
}

pub type CheckResult<T> = Result<T, CheckError>;
