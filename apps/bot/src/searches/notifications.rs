use crate::domain::dates::{AvailableDates, CLOSEST_PREFIX, SELECTED_PREFIX};

/// Short heads-up sent before the detailed message
pub fn found_heads_up(service_description: &str) -> String {
    format!("⚠️ Found appointments for {}!", service_description)
}

/// Detailed message for a successful scheduled check
pub fn found_details(job_name: &str, dates: &AvailableDates) -> String {
    match dates {
        AvailableDates::Exact(date) => format!(
            "✅ APPOINTMENT BOOKED for {}:\n\n• {}: {}\n\nYour appointment has been automatically booked based on your preference.",
            job_name, SELECTED_PREFIX, date
        ),
        AvailableDates::Closest { closest, others } => {
            let mut message = format!(
                "✅ CLOSEST DATE FOUND for {}:\n\n• {}: {}\n\nThis is the closest date to your preference. Please log in to book your appointment.",
                job_name, CLOSEST_PREFIX, closest
            );
            if !others.is_empty() {
                message.push_str("\n\nOther available dates:\n• ");
                message.push_str(&others.join("\n• "));
            }
            message
        }
        AvailableDates::Listed(dates) => format!(
            "✅ AVAILABLE DATES FOUND for {}:\n\n• {}\n\nPlease log in to the system as soon as possible to book your appointment.",
            job_name,
            dates.join("\n• ")
        ),
    }
}

pub fn preferred_date_request(job_name: &str) -> String {
    format!("Please set your preferred appointment date for {}:", job_name)
}

pub fn search_started(job_name: &str) -> String {
    format!(
        "Starting automatic search for {}. I'll notify you when appointments become available.",
        job_name
    )
}
