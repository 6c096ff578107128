use super::value_objects::{option_for_job, FormKind, JobStatus, ServiceOption, ServiceType};

/// Maximum number of searches a single user may keep at once
pub const MAX_JOBS_PER_USER: usize = 15;

/// An appointment search registered by a Telegram user
///
/// The name is chosen by the user and is unique per user, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJob {
    pub id: i32,
    pub user_id: i64,
    pub name: String,
    pub status: JobStatus,
    pub service_type: ServiceType,
}

impl SearchJob {
    /// Whether the registration form was received and the search may run
    pub fn is_active(&self) -> bool {
        self.status == JobStatus::Active
    }

    /// Site option this job searches for
    pub fn service_option(&self) -> ServiceOption {
        option_for_job(self.service_type, &self.name)
    }

    /// Form used to (re)submit data for this job
    pub fn form(&self) -> Option<FormKind> {
        self.service_option().form()
    }

    /// Case-insensitive comparison used for duplicate detection
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
