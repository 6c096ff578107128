use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Booking page for the Menores Ley 36 services
pub const MENORES_URL: &str =
    "https://www.exteriores.gob.es/Consulados/lahabana/es/ServiciosConsulares/Paginas/menorescita.aspx";

/// Booking page for the birth certificate services
pub const CERTIFICATE_URL: &str = "https://www.exteriores.gob.es/Consulados/lahabana/es/ServiciosConsulares/Paginas/index.aspx?scco=Cuba&scd=166&scca=Certificados&scs=Certificado+de+nacimiento";

/// Family of consular services a search belongs to
///
/// Persisted as lowercase text in `user_jobs.service_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Menores,
    Certificate,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Menores => "menores",
            ServiceType::Certificate => "certificate",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "menores" => Ok(ServiceType::Menores),
            "certificate" => Ok(ServiceType::Certificate),
            other => Err(format!("Unknown service type: {}", other)),
        }
    }
}

/// Lifecycle status of a search
///
/// ```text
/// pending_form -> active
/// ```
/// A job is created as `pending_form` and only becomes `active` once the
/// registration form for it has been stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    PendingForm,
    Active,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::PendingForm => "pending_form",
            JobStatus::Active => "active",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_form" => Ok(JobStatus::PendingForm),
            "active" => Ok(JobStatus::Active),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

/// Number of children in a Menores Ley 36 registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildCount {
    One,
    Two,
    Three,
}

impl ChildCount {
    /// Suffix used both in the site's option label and in job names
    pub fn suffix(&self) -> &'static str {
        match self {
            ChildCount::One => "1 HIJO",
            ChildCount::Two => "2 HIJOS",
            ChildCount::Three => "3 HIJOS",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.trim() {
            "1 HIJO" => Some(ChildCount::One),
            "2 HIJOS" => Some(ChildCount::Two),
            "3 HIJOS" => Some(ChildCount::Three),
            _ => None,
        }
    }
}

/// Registration form hosted next to the bot, one per service shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    First,
    Second,
    Third,
    Certificate,
}

impl FormKind {
    /// Page name without the `_option.html` suffix
    pub fn page(&self) -> &'static str {
        match self {
            FormKind::First => "first",
            FormKind::Second => "second",
            FormKind::Third => "third",
            FormKind::Certificate => "certificate",
        }
    }
}

/// A bookable service as presented to users and to the consulate site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOption {
    /// Entry point of the Menores flow, resolved to a single child on the site
    MenoresGeneral,
    Menores(ChildCount),
    BirthCertificate,
    BirthCertificateDni,
}

impl ServiceOption {
    pub const MENORES_GENERAL_LABEL: &'static str = "Reservar Cita de Menores Ley 36";
    const MENORES_PREFIX: &'static str = "INSCRIPCIÓN MENORES LEY36 OPCIÓN";
    const CERTIFICATE_LABEL: &'static str = "Solicitar certificación de Nacimiento";
    const CERTIFICATE_DNI_LABEL: &'static str = "Solicitar certificación de Nacimiento para DNI";

    /// Options a user can pick when naming a new search
    pub const SEARCHABLE: [ServiceOption; 5] = [
        ServiceOption::Menores(ChildCount::One),
        ServiceOption::Menores(ChildCount::Two),
        ServiceOption::Menores(ChildCount::Three),
        ServiceOption::BirthCertificate,
        ServiceOption::BirthCertificateDni,
    ];

    /// Text of the option, identical to the keyboard button and the site link
    pub fn label(&self) -> String {
        match self {
            ServiceOption::MenoresGeneral => Self::MENORES_GENERAL_LABEL.to_string(),
            ServiceOption::Menores(count) => format!("{} {}", Self::MENORES_PREFIX, count.suffix()),
            ServiceOption::BirthCertificate => Self::CERTIFICATE_LABEL.to_string(),
            ServiceOption::BirthCertificateDni => Self::CERTIFICATE_DNI_LABEL.to_string(),
        }
    }

    /// Parses a keyboard label back into an option
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label == Self::MENORES_GENERAL_LABEL {
            return Some(ServiceOption::MenoresGeneral);
        }
        if label == Self::CERTIFICATE_LABEL {
            return Some(ServiceOption::BirthCertificate);
        }
        if label == Self::CERTIFICATE_DNI_LABEL {
            return Some(ServiceOption::BirthCertificateDni);
        }
        label
            .strip_prefix(Self::MENORES_PREFIX)
            .and_then(ChildCount::from_suffix)
            .map(ServiceOption::Menores)
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceOption::MenoresGeneral | ServiceOption::Menores(_) => ServiceType::Menores,
            ServiceOption::BirthCertificate | ServiceOption::BirthCertificateDni => {
                ServiceType::Certificate
            }
        }
    }

    /// Landing page the browser opens for this option
    pub fn url(&self) -> &'static str {
        match self.service_type() {
            ServiceType::Menores => MENORES_URL,
            ServiceType::Certificate => CERTIFICATE_URL,
        }
    }

    /// Registration form to send for this option, if any
    pub fn form(&self) -> Option<FormKind> {
        match self {
            ServiceOption::MenoresGeneral => None,
            ServiceOption::Menores(ChildCount::One) => Some(FormKind::First),
            ServiceOption::Menores(ChildCount::Two) => Some(FormKind::Second),
            ServiceOption::Menores(ChildCount::Three) => Some(FormKind::Third),
            ServiceOption::BirthCertificate | ServiceOption::BirthCertificateDni => {
                Some(FormKind::Certificate)
            }
        }
    }

    /// Description used in "Found appointments for ..." notifications
    pub fn description(&self) -> String {
        match self {
            ServiceOption::MenoresGeneral | ServiceOption::Menores(_) => {
                Self::MENORES_GENERAL_LABEL.to_string()
            }
            other => other.label(),
        }
    }

    /// Builds the job name for a user supplied appointment name
    ///
    /// Menores jobs keep only the child count (`"Maria, 2 HIJOS"`),
    /// certificate jobs keep the whole option label.
    pub fn job_name(&self, appointment_name: &str) -> String {
        let appointment_name = appointment_name.trim();
        match self {
            ServiceOption::Menores(count) => format!("{}, {}", appointment_name, count.suffix()),
            ServiceOption::MenoresGeneral => {
                format!("{}, {}", appointment_name, ChildCount::One.suffix())
            }
            other => format!("{}, {}", appointment_name, other.label()),
        }
    }
}

impl fmt::Display for ServiceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Recovers the option a stored job was created for
///
/// Menores jobs carry the child count after the last `", "`; an
/// unrecognised suffix falls back to the general Menores option.
pub fn option_for_job(service_type: ServiceType, job_name: &str) -> ServiceOption {
    match service_type {
        ServiceType::Menores => job_name
            .rsplit(", ")
            .next()
            .and_then(ChildCount::from_suffix)
            .map(ServiceOption::Menores)
            .unwrap_or(ServiceOption::MenoresGeneral),
        ServiceType::Certificate => {
            if job_name.contains("para DNI") {
                ServiceOption::BirthCertificateDni
            } else {
                ServiceOption::BirthCertificate
            }
        }
    }
}
