use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::job::ServiceOption;

/// Conversation state of one user between messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Option picked from the keyboard, waiting for a search name
    pub pending_option: Option<ServiceOption>,
    /// Last accepted search name, used by the registration form links
    pub pending_job_name: Option<String>,
    /// Date typed while several searches exist, waiting for a `date_` callback
    pub pending_preferred_date: Option<String>,
}

/// In-memory sessions keyed by Telegram user id
#[derive(Default)]
pub struct Sessions {
    inner: Mutex<HashMap<i64, Session>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Session>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, user_id: i64) -> Session {
        self.lock().get(&user_id).cloned().unwrap_or_default()
    }

    pub fn update<R>(&self, user_id: i64, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.lock();
        f(sessions.entry(user_id).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_per_user() {
        let sessions = Sessions::new();
        sessions.update(1, |s| s.pending_option = Some(ServiceOption::BirthCertificate));

        assert_eq!(sessions.get(1).pending_option, Some(ServiceOption::BirthCertificate));
        assert_eq!(sessions.get(2), Session::default());
    }

    #[test]
    fn update_returns_closure_result() {
        let sessions = Sessions::new();
        sessions.update(1, |s| s.pending_preferred_date = Some("01/02/2025".into()));
        let taken = sessions.update(1, |s| s.pending_preferred_date.take());

        assert_eq!(taken.as_deref(), Some("01/02/2025"));
        assert_eq!(sessions.get(1).pending_preferred_date, None);
    }
}
