// Appointment availability checks
//
// Drives a browser session through the consulate booking site and
// returns the slots it offers for one service option.

pub mod checker;
pub mod errors;
mod flows;
mod scripts;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::dates::AvailableDates;
use crate::domain::job::ServiceOption;

pub use checker::{BrowserAppointmentChecker, CheckerSettings};
pub use errors::{CheckError, CheckResult};

/// Attempts made by the scheduled searches
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Source of appointment availability
#[async_trait]
pub trait AppointmentChecker: Send + Sync {
    /// Available slots for `option`, compared with `preferred_date` (`DD/MM/YYYY`)
    ///
    /// An empty result means the site answered "no slots". Every attempt
    /// failing yields [`CheckError::Exhausted`].
    async fn check(
        &self,
        option: ServiceOption,
        preferred_date: Option<&str>,
        max_attempts: u32,
    ) -> CheckResult<AvailableDates>;
}

/// Runs `check` bounded by `limit`
pub async fn check_within(
    checker: &dyn AppointmentChecker,
    option: ServiceOption,
    preferred_date: Option<&str>,
    max_attempts: u32,
    limit: Duration,
) -> CheckResult<AvailableDates> {
    tokio::time::timeout(limit, checker.check(option, preferred_date, max_attempts))
        .await
        .map_err(|_| CheckError::TimedOut(limit))?
}
