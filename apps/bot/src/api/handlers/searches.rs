use std::time::Duration;

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::bot::keyboards;
use crate::searches::{notifications, SearchService};

const MISSING_PARAMETERS: &str = "Missing user_id or job_name";

/// The form page sends the user id as a number or as a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserIdField {
    Number(i64),
    Text(String),
}

impl UserIdField {
    pub fn value(&self) -> Option<i64> {
        match self {
            UserIdField::Number(id) => Some(*id),
            UserIdField::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Request body for starting a search
#[derive(Debug, Deserialize)]
pub struct StartSearchRequest {
    #[serde(default)]
    pub user_id: Option<UserIdField>,
    #[serde(default)]
    pub job_name: Option<String>,
}

/// Start checking a search whose form was submitted
///
/// POST /start-search
pub async fn start_search(
    State(state): State<AppState>,
    Extension(searches): Extension<SearchService>,
    payload: Result<Json<StartSearchRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!(error = %e, "Invalid start search request");
        ApiError::bad_request(MISSING_PARAMETERS)
    })?;

    let user_id = request.user_id.as_ref().and_then(UserIdField::value);
    let job_name = request.job_name.filter(|name| !name.trim().is_empty());
    let (Some(user_id), Some(job_name)) = (user_id, job_name) else {
        tracing::error!("Missing required parameters for start search");
        return Err(ApiError::bad_request(MISSING_PARAMETERS));
    };

    let Some(job) = state
        .jobs
        .find(user_id, &job_name)
        .await?
        .filter(|job| job.is_active())
    else {
        tracing::warn!(user_id, job = %job_name, "Job is not marked as active");
        return Err(ApiError::bad_request("Job not ready"));
    };

    searches.start(&job, Duration::ZERO);

    let menu = keyboards::main_menu_for(state.jobs.as_ref(), user_id).await;
    if let Err(e) = state
        .messenger
        .send_message(user_id, &notifications::search_started(&job.name), Some(menu.into()))
        .await
    {
        tracing::error!(user_id, error = %e, "Error sending Telegram message");
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Search job scheduled"
    })))
}
