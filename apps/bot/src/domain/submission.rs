use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;

/// Number of child slots on the registration forms
pub const MAX_CHILDREN: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Missing required parameters")]
    MissingParameters,

    #[error("Invalid chat id: {0}")]
    InvalidChatId(String),
}

/// One child block of a Menores registration form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildDetails {
    pub identifier: Option<String>,
    pub name: Option<String>,
    pub birth_date: Option<String>,
}

impl ChildDetails {
    fn is_filled(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Data posted by one of the static registration forms
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub user_id: i64,
    pub job_name: String,
    pub volume_page_number: Option<String>,
    pub password: Option<String>,
    pub children: [ChildDetails; MAX_CHILDREN],
    pub preferred_date: Option<String>,
    /// Fields the form sent that have no dedicated column
    pub extra: BTreeMap<String, String>,
}

impl FormSubmission {
    /// Builds a submission from url-encoded form fields
    ///
    /// Known camelCase keys are mapped onto their columns; any other key
    /// is lowercased with spaces turned into underscores and kept in
    /// `extra`. `chat_id` and `job_name` are required.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, SubmissionError> {
        let chat_id = non_empty(fields.get("chat_id")).ok_or(SubmissionError::MissingParameters)?;
        let job_name = non_empty(fields.get("job_name")).ok_or(SubmissionError::MissingParameters)?;
        let user_id = chat_id
            .trim()
            .parse::<i64>()
            .map_err(|_| SubmissionError::InvalidChatId(chat_id.clone()))?;

        let mut submission = FormSubmission {
            user_id,
            job_name,
            volume_page_number: None,
            password: None,
            children: Default::default(),
            preferred_date: None,
            extra: BTreeMap::new(),
        };

        for (key, value) in fields {
            let value = Some(value.clone()).filter(|v| !v.is_empty());
            match key.as_str() {
                "chat_id" | "job_name" => {}
                "volumePageNumber" => submission.volume_page_number = value,
                "password" => submission.password = value,
                "preferredDate" | "preferred_date" => submission.preferred_date = value,
                other => match child_field(other) {
                    Some((slot, field)) => {
                        let child = &mut submission.children[slot];
                        match field {
                            ChildField::Identifier => child.identifier = value,
                            ChildField::Name => child.name = value,
                            ChildField::BirthDate => child.birth_date = value,
                        }
                    }
                    None => {
                        let normalized = other.to_lowercase().replace(' ', "_");
                        if normalized != "chat_id" && normalized != "job_name" {
                            submission
                                .extra
                                .insert(normalized, value.unwrap_or_default());
                        }
                    }
                },
            }
        }

        Ok(submission)
    }

    /// Confirmation text sent back to the user
    ///
    /// Only children with a name are listed.
    pub fn summary(&self) -> String {
        let mut message = String::from("Form Submission Received:\n\n");
        message.push_str(&format!(
            "Parent Identifier:\nVolume Page Number: {}\n\n",
            or_na(&self.volume_page_number)
        ));

        for (index, child) in self.children.iter().enumerate() {
            if !child.is_filled() {
                continue;
            }
            message.push_str(&format!("Child {}:\n", index + 1));
            message.push_str(&format!("Identifier: {}\n", or_na(&child.identifier)));
            message.push_str(&format!("Name: {}\n", or_na(&child.name)));
            message.push_str(&format!("Birth Date: {}\n\n", or_na(&child.birth_date)));
        }

        message.push_str("Registration form submitted successfully. Automatic search will start.");
        message
    }
}

impl fmt::Debug for FormSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSubmission")
            .field("user_id", &self.user_id)
            .field("job_name", &self.job_name)
            .field("volume_page_number", &self.volume_page_number)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("children", &self.children)
            .field("preferred_date", &self.preferred_date)
            .field("extra", &self.extra)
            .finish()
    }
}

enum ChildField {
    Identifier,
    Name,
    BirthDate,
}

/// Maps `child{N}Identifier|Name|BirthDate` to a slot index and field
fn child_field(key: &str) -> Option<(usize, ChildField)> {
    let rest = key.strip_prefix("child")?;
    let mut chars = rest.chars();
    let digit = chars.next()?.to_digit(10)? as usize;
    if digit == 0 || digit > MAX_CHILDREN {
        return None;
    }
    let field = match chars.as_str() {
        "Identifier" => ChildField::Identifier,
        "Name" => ChildField::Name,
        "BirthDate" => ChildField::BirthDate,
        _ => return None,
    };
    Some((digit - 1, field))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}
