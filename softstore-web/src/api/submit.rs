//! Program submission routes
//!
//! `GET /submit` renders the form. `POST /submit` validates the form fields,
//! runs the submission pipeline and redirects back to the form with a
//! `success` or `error` message key in the query string.

use crate::api::pages::{self, SubmitView};
use crate::error::{ApiError, PageResult};
use crate::messages;
use crate::submission::form::{FIELD_CATEGORY_ID, FIELD_DESCRIPTION, FIELD_FILE, FIELD_NAME};
use crate::submission::{
    validate_form, ProgramForm, SubmissionOutcome, SubmissionRequest, UploadedArchive,
};
use crate::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{debug, info};

/// Message keys carried across the post/redirect/get cycle
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// GET /submit
pub async fn get_submit_form(
    State(state): State<AppState>,
    Query(flash): Query<FlashQuery>,
) -> PageResult<Response> {
    debug!("Getting program submit form");
    let categories = state.store.get_all_categories().await?;

    let view = SubmitView {
        categories: &categories,
        max_file_size_kb: state.max_upload_size_kb(),
        success_message: flash.success.as_deref().and_then(messages::lookup),
        error_message: flash.error.as_deref().and_then(messages::lookup),
        ..Default::default()
    };

    Ok(pages::submit_page(&view).into_response())
}

/// POST /submit
pub async fn submit_program(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> PageResult<Response> {
    let form = read_form(&mut multipart).await?;
    let categories = state.store.get_all_categories().await?;

    let errors = validate_form(&form, &categories, state.max_upload_size_bytes);
    if !errors.is_empty() {
        debug!("Submission form rejected with {} field errors", errors.len());
        let view = SubmitView {
            categories: &categories,
            max_file_size_kb: state.max_upload_size_kb(),
            name: &form.name,
            description: &form.description,
            category_id: form.category_id,
            errors: &errors,
            ..Default::default()
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, pages::submit_page(&view)).into_response());
    }

    let (Some(category_id), Some(archive)) = (form.category_id, form.file) else {
        return Err(ApiError::BadRequest("incomplete submission form".to_string()).into());
    };

    let request = SubmissionRequest {
        name: form.name.trim().to_string(),
        description: form.description.trim().to_string(),
        category_id,
        archive,
    };
    info!(
        "Received submission '{}' ({} bytes) for category {}",
        request.name,
        request.archive.len(),
        category_id
    );

    let outcome = state.pipeline.submit(request).await?;
    Ok(redirect_for(&outcome).into_response())
}

/// Redirect back to the form carrying the outcome's message key
pub fn redirect_for(outcome: &SubmissionOutcome) -> Redirect {
    let param = if outcome.is_success() { "success" } else { "error" };
    Redirect::to(&format!("/submit?{}={}", param, outcome.message_key()))
}

async fn read_form(multipart: &mut Multipart) -> Result<ProgramForm, MultipartError> {
    let mut form = ProgramForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };

        match field_name.as_str() {
            FIELD_NAME => form.name = field.text().await?,
            FIELD_DESCRIPTION => form.description = field.text().await?,
            FIELD_CATEGORY_ID => form.category_id = field.text().await?.trim().parse().ok(),
            FIELD_FILE => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file was chosen
                if !(file_name.is_empty() && bytes.is_empty()) {
                    form.file = Some(UploadedArchive::new(file_name, bytes.to_vec()));
                }
            }
            other => debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    Ok(form)
}

/// Build submission routes
pub fn submit_routes() -> Router<AppState> {
    Router::new().route("/submit", get(get_submit_form).post(submit_program))
}
