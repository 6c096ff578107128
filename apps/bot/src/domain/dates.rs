//! Date handling for appointment slots.
//!
//! The consulate calendars render dates in several shapes (`15 de Abril de
//! 2025`, `15/04/2025`, ...). Users give their preference as `DD/MM/YYYY`.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Prefix marking a slot that matches the preferred date exactly
pub const SELECTED_PREFIX: &str = "SELECTED";
/// Prefix marking the slot closest to the preferred date
pub const CLOSEST_PREFIX: &str = "CLOSEST AVAILABLE";

const SPANISH_MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

fn preferred_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("static regex"))
}

/// Whether a chat message looks like a preferred date (`D/M/YYYY`)
pub fn is_preferred_date_format(text: &str) -> bool {
    preferred_date_regex().is_match(text.trim())
}

/// Parses a user preference in `DD/MM/YYYY`
pub fn parse_preferred_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d/%m/%Y").ok()
}

/// Parses a date as rendered by the booking calendars
pub fn parse_site_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    for format in ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    parse_month_name_date(text)
}

/// `15 de Abril de 2025` or `15 Abril 2025`, Spanish or English month names
fn parse_month_name_date(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text
        .split_whitespace()
        .filter(|token| !token.eq_ignore_ascii_case("de"))
        .collect();
    let [day, month, year] = tokens.as_slice() else {
        return None;
    };

    let day: u32 = day.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    let month = month_number(month)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let name = if name == "setiembre" { "septiembre".to_string() } else { name };
    SPANISH_MONTHS
        .iter()
        .position(|m| *m == name)
        .or_else(|| ENGLISH_MONTHS.iter().position(|m| *m == name))
        .map(|index| index as u32 + 1)
}

/// Available slots after comparing them with the user's preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailableDates {
    /// A slot on exactly the preferred day
    Exact(String),
    /// The slot nearest to the preference, followed by the remaining slots
    Closest { closest: String, others: Vec<String> },
    /// No preference (or nothing comparable); slots as found
    Listed(Vec<String>),
}

impl AvailableDates {
    pub fn is_empty(&self) -> bool {
        matches!(self, AvailableDates::Listed(dates) if dates.is_empty())
    }

    /// Flat list with the preference markers, as shown in manual checks
    pub fn labels(&self) -> Vec<String> {
        match self {
            AvailableDates::Exact(date) => vec![format!("{}: {}", SELECTED_PREFIX, date)],
            AvailableDates::Closest { closest, others } => {
                let mut labels = vec![format!("{}: {}", CLOSEST_PREFIX, closest)];
                labels.extend(others.iter().cloned());
                labels
            }
            AvailableDates::Listed(dates) => dates.clone(),
        }
    }
}

/// Compares scraped slots with the preferred date
///
/// An exact match wins. Otherwise the first slot with the smallest
/// distance in days becomes the closest one. Slots that do not parse are
/// never chosen but stay in the list. An unparseable preference leaves
/// the slots untouched.
pub fn match_preferred(dates: Vec<String>, preferred: Option<&str>) -> AvailableDates {
    let Some(preferred) = preferred.filter(|p| !p.trim().is_empty()) else {
        return AvailableDates::Listed(dates);
    };
    let Some(preferred) = parse_preferred_date(preferred) else {
        tracing::warn!(preferred, "Invalid preferred date format");
        return AvailableDates::Listed(dates);
    };

    let mut closest: Option<(i64, &String)> = None;
    for date in &dates {
        let Some(parsed) = parse_site_date(date) else {
            continue;
        };
        if parsed == preferred {
            return AvailableDates::Exact(date.clone());
        }
        let distance = (parsed - preferred).num_days().abs();
        if closest.map_or(true, |(best, _)| distance < best) {
            closest = Some((distance, date));
        }
    }

    match closest {
        Some((_, closest)) => {
            let closest = closest.clone();
            let others = dates.into_iter().filter(|d| *d != closest).collect();
            AvailableDates::Closest { closest, others }
        }
        None => AvailableDates::Listed(dates),
    }
}
