use std::time::Duration;

use serde_json::Value;

use super::scripts;
use crate::domain::job::{ChildCount, ServiceOption};
use crate::infrastructure::browser::{xpath_literal, BrowserPage, BrowserResult, Locator};

const NO_SLOTS_TEXT: &str = "No hay horas";
const CONTINUE_BUTTON: &str = "#bktContinue";
const CAPTCHA_BUTTON: &str = "#idCaptchaButton";
const SERVICE_LIST: &str = "#idListServices";
const SERVICE_NAME: &str = ".clsBktServiceName";

/// Certificate requests: pick the certificate link, continue, read the calendar
pub async fn certificate(
    page: &dyn BrowserPage,
    option: ServiceOption,
    timeout: Duration,
) -> BrowserResult<Option<Vec<String>>> {
    tracing::info!(option = %option, "Certificate service detected");

    let label = option.label();
    if let Some(link) = page.find(&Locator::text(&label)).await? {
        page.click(&link).await?;
        tracing::info!("Clicked certificate link");
    } else {
        tracing::error!("Certificate link not found, trying alternative method");
        click_link_containing(page, &["certificación", "nacimiento"]).await?;
    }
    page.wait_until_loaded(timeout).await?;

    if !click_if_present(page, &Locator::css(CONTINUE_BUTTON)).await? {
        tracing::error!("Continue button not found for certificate");
    }
    page.wait_until_loaded(timeout).await?;

    if page.find(&Locator::text(NO_SLOTS_TEXT)).await?.is_some() {
        tracing::info!("No available dates found for certificate");
        return Ok(Some(Vec::new()));
    }
    Ok(Some(extract_dates(page).await))
}

/// Menores Ley 36: open the booking widget, pick the child count option, read the calendar
///
/// Returns `None` when the option cannot be found on the page.
pub async fn menores(
    page: &dyn BrowserPage,
    option: ServiceOption,
    timeout: Duration,
) -> BrowserResult<Option<Vec<String>>> {
    tracing::info!(option = %option, "Menores Ley 36 service detected");

    if let Some(link) = page
        .find(&Locator::text(ServiceOption::MENORES_GENERAL_LABEL))
        .await?
    {
        page.click(&link).await?;
        tracing::info!("Clicked Menores Ley 36 link");
    } else {
        tracing::error!("Menores Ley 36 link not found, trying alternative method");
        click_link_containing(page, &["menores", "ley 36"]).await?;
    }
    page.wait_until_loaded(timeout).await?;

    if click_if_present(page, &Locator::css(CAPTCHA_BUTTON)).await? {
        tracing::info!("Clicked captcha button");
    }
    if !click_if_present(page, &Locator::css(CONTINUE_BUTTON)).await? {
        tracing::error!("Continue button not found for Menores");
    }
    if click_if_present(page, &Locator::text("Aceptar")).await? {
        tracing::info!("Clicked acceptar button");
    }

    match page.wait_for(&Locator::css(SERVICE_LIST), timeout).await {
        Ok(_) => tracing::info!("Service options loaded"),
        Err(e) if e.is_timeout() => {
            tracing::error!("Service options not loaded, trying to continue anyway")
        }
        Err(e) => return Err(e),
    }

    // The general entry books for a single child
    let option_text = match option {
        ServiceOption::MenoresGeneral => ServiceOption::Menores(ChildCount::One).label(),
        other => other.label(),
    };
    tracing::info!(option = %option_text, "Looking for option");

    if !click_service_option(page, &option_text).await? {
        tracing::error!("Could not find and click the requested service option");
        return Ok(None);
    }
    page.wait_until_loaded(timeout).await?;

    if page.find(&Locator::text(NO_SLOTS_TEXT)).await?.is_some() {
        tracing::info!(option = %option_text, "No available dates found");
        return Ok(Some(Vec::new()));
    }
    Ok(Some(extract_dates(page).await))
}

async fn click_if_present(page: &dyn BrowserPage, locator: &Locator) -> BrowserResult<bool> {
    match page.find(locator).await? {
        Some(element) => {
            page.click(&element).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Clicks the first link whose text contains every needle (case insensitive)
async fn click_link_containing(page: &dyn BrowserPage, needles: &[&str]) -> BrowserResult<bool> {
    for link in page.find_all(&Locator::css("a")).await? {
        let text = page.text(&link).await?;
        let lower = text.to_lowercase();
        if needles.iter().all(|needle| lower.contains(needle)) {
            page.click(&link).await?;
            tracing::info!(text = %text, "Clicked alternative link");
            return Ok(true);
        }
    }
    Ok(false)
}

async fn click_service_option(page: &dyn BrowserPage, option_text: &str) -> BrowserResult<bool> {
    let literal = xpath_literal(option_text);
    let strategies = [
        Locator::text(option_text),
        Locator::xpath(format!("//div[contains(text(), {literal})]")),
        Locator::xpath(format!("//a[contains(text(), {literal})]")),
    ];

    for locator in &strategies {
        match click_if_present(page, locator).await {
            Ok(true) => {
                tracing::info!(locator = ?locator, "Clicked on option");
                return Ok(true);
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(locator = ?locator, error = %e, "Error using selector"),
        }
    }

    tracing::error!(option = %option_text, "Option not found with standard selectors");
    let wanted = option_text.to_lowercase();
    for service in page.find_all(&Locator::css(SERVICE_NAME)).await? {
        let text = page.text(&service).await?;
        if text.to_lowercase().contains(&wanted) {
            page.click(&service).await?;
            tracing::info!(text = %text, "Clicked alternative service");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Scrapes slots from the calendar; failures count as no slots
async fn extract_dates(page: &dyn BrowserPage) -> Vec<String> {
    let mut dates = run_date_script(page, scripts::MARKED_DATES).await;
    if dates.is_empty() {
        dates = run_date_script(page, scripts::DATEPICKER_DAYS).await;
    }
    if dates.is_empty() {
        tracing::info!("No available dates found");
    } else {
        tracing::info!(count = dates.len(), "Found available dates");
    }
    dates
}

async fn run_date_script(page: &dyn BrowserPage, script: &str) -> Vec<String> {
    match page.execute(script).await {
        Ok(Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::error!(error = %e, "Error extracting dates");
            Vec::new()
        }
    }
}
