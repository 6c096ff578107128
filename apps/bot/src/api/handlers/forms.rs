use std::collections::HashMap;

use axum::{extract::rejection::FormRejection, extract::State, Form, Json};
use serde_json::{json, Value};

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::submission::{FormSubmission, SubmissionError};
use crate::infrastructure::error_reporter::ErrorReport;

const PROCESSING_ERROR: &str = "Error: Form submission processing error. Please try again.";

/// Receive a registration form
///
/// POST /submit-form
///
/// Answers right away; the submission is stored in the background and
/// the outcome is reported to the user over Telegram.
pub async fn submit_form(
    State(state): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Json<Value>, ApiError> {
    let Form(fields) = form.map_err(|e| {
        tracing::warn!(error = %e, "Unreadable form submission");
        ApiError::from(SubmissionError::MissingParameters)
    })?;
    tracing::info!("Form Submission Received");

    let submission = FormSubmission::from_form(&fields).map_err(|e| {
        tracing::error!(error = %e, "Rejected form submission");
        ApiError::from(e)
    })?;
    tracing::info!(
        user_id = submission.user_id,
        job = %submission.job_name,
        extra_fields = submission.extra.len(),
        "Transformed form data"
    );

    state.users.upsert(submission.user_id).await?;

    let user_id = submission.user_id;
    let job_name = submission.job_name.clone();
    tokio::spawn(process_submission(state, submission));
    tracing::info!(user_id, job = %job_name, "Background processing initiated");

    Ok(Json(json!({
        "status": "success",
        "message": "Form received and processing started."
    })))
}

async fn process_submission(state: AppState, submission: FormSubmission) {
    let user_id = submission.user_id;
    tracing::info!(user_id, job = %submission.job_name, "Background processing started");

    let saved = tokio::time::timeout(state.save_timeout, state.submissions.save(&submission)).await;
    let failure = match saved {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("Saving timed out after {:?}", state.save_timeout)),
    };

    let messages = match failure {
        None => vec![
            submission.summary(),
            format!("Starting automatic search for {}.", submission.job_name),
        ],
        Some(reason) => {
            tracing::error!(user_id, job = %submission.job_name, error = %reason, "Form submission failed");
            state
                .reporter
                .report(
                    ErrorReport::new(user_id, "Form submission failed")
                        .job(&submission.job_name)
                        .details(reason),
                )
                .await;
            vec![PROCESSING_ERROR.to_string()]
        }
    };

    for text in messages {
        if let Err(e) = state.messenger.send_message(user_id, &text, None).await {
            tracing::error!(user_id, error = %e, "Failed to send Telegram message");
        }
    }
}
