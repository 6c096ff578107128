use url::form_urlencoded;

use crate::domain::job::{ChildCount, FormKind, SearchJob, ServiceOption};
use crate::domain::repositories::JobRepository;
use crate::infrastructure::telegram::{
    InlineKeyboardButton, InlineKeyboardMarkup, ReplyKeyboardMarkup,
};

pub const SEARCH_NEW: &str = "Search for new appointments";
pub const CANCEL_SEARCH: &str = "Cancel search for appointment";
pub const CHECK_SEARCHES: &str = "Check my appointments";
pub const REGISTRATION_FORMS: &str = "Registration forms";
pub const CANCEL: &str = "CANCEL";

pub const CHOOSE_OPTION: &str = "Please choose an option:";

/// Main menu; cancel and check entries only make sense with searches
pub fn main_menu(has_searches: bool) -> ReplyKeyboardMarkup {
    let mut labels = vec![SEARCH_NEW];
    if has_searches {
        labels.push(CANCEL_SEARCH);
        labels.push(CHECK_SEARCHES);
    }
    ReplyKeyboardMarkup::single_column(labels, false)
}

/// Main menu for `user_id`; a failed lookup shows the short menu
pub async fn main_menu_for(jobs: &dyn JobRepository, user_id: i64) -> ReplyKeyboardMarkup {
    match jobs.list_for_user(user_id).await {
        Ok(list) => main_menu(!list.is_empty()),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Could not load searches for menu");
            main_menu(false)
        }
    }
}

pub fn service_options() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::single_column(
        [
            ServiceOption::MenoresGeneral.label(),
            ServiceOption::BirthCertificate.label(),
            ServiceOption::BirthCertificateDni.label(),
            CANCEL.to_string(),
        ],
        true,
    )
}

pub fn children_options() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::single_column(
        [
            ServiceOption::Menores(ChildCount::One).label(),
            ServiceOption::Menores(ChildCount::Two).label(),
            ServiceOption::Menores(ChildCount::Three).label(),
            CANCEL.to_string(),
        ],
        true,
    )
}

/// Link to a hosted registration form, prefilled with the chat and search
pub fn form_url(
    base_url: &str,
    form: FormKind,
    chat_id: i64,
    job_name: Option<&str>,
    prefill: bool,
) -> String {
    let mut url = format!(
        "{}/{}_option.html?chat_id={}",
        base_url.trim_end_matches('/'),
        form.page(),
        chat_id
    );
    if let Some(job_name) = job_name {
        let encoded: String = form_urlencoded::byte_serialize(job_name.as_bytes()).collect();
        url.push_str("&job_name=");
        url.push_str(&encoded);
    }
    if prefill {
        url.push_str("&prefill=true");
    }
    url
}

/// The three Menores registration forms
pub fn registration_forms(base_url: &str, chat_id: i64, job_name: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column([
        InlineKeyboardButton::link(
            "Registration for 1 Child",
            form_url(base_url, FormKind::First, chat_id, job_name, false),
        ),
        InlineKeyboardButton::link(
            "Registration for 2 Children",
            form_url(base_url, FormKind::Second, chat_id, job_name, false),
        ),
        InlineKeyboardButton::link(
            "Registration for 3 Children",
            form_url(base_url, FormKind::Third, chat_id, job_name, false),
        ),
    ])
}

pub fn fill_form(url: String) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column([InlineKeyboardButton::link("Fill Registration Form", url)])
}

pub fn set_preferred_date(url: String) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column([InlineKeyboardButton::link("Set Preferred Date", url)])
}

/// One button per search with `{prefix}{id}` callbacks, plus an optional trailing button
pub fn job_buttons(
    jobs: &[SearchJob],
    prefix: &str,
    trailing: Option<(&str, &str)>,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<InlineKeyboardButton> = jobs
        .iter()
        .map(|job| InlineKeyboardButton::callback(job.name.clone(), format!("{}{}", prefix, job.id)))
        .collect();
    if let Some((text, data)) = trailing {
        buttons.push(InlineKeyboardButton::callback(text, data));
    }
    InlineKeyboardMarkup::single_column(buttons)
}
