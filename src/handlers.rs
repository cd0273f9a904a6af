//! HTTP route handlers.
//!
//! - `GET /`         upload form
//! - `POST /`        run a submission, render the report
//! - `GET /download` the last persisted report as an attachment

use crate::error::AppError;
use crate::pipeline::validate::DocumentRole;
use crate::report::{Stage, SubmissionForm, UploadedDocument};
use crate::server::AppState;
use crate::templates::{IndexTemplate, ResultTemplate};
use askama::Template;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tracing::debug;

/// Landing page with the upload form.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_form(&state, None)
}

/// Handle a form submission.
///
/// Validation and extraction failures re-render the form with a message;
/// every other failure becomes an error page via [`AppError`]'s
/// `IntoResponse`.
pub async fn submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;

    match state.pipeline.run(form).await {
        Ok(report) => {
            let html = ResultTemplate {
                api_output: &report.text,
                stats: &report.stats,
            }
            .render()?;
            debug!("stage={}", Stage::Responded);
            Ok(Html(html).into_response())
        }
        Err(e) if e.is_form_level() => {
            tracing::info!("Submission rejected: {}", e);
            let page = render_form(&state, Some(&e.user_message()))?;
            Ok((e.status_code(), page).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Serve the persisted report.
pub async fn download(State(state): State<AppState>) -> Result<Response, AppError> {
    let store = &state.pipeline.store;
    let bytes = store.read_output().await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", store.output_file_name()),
        )
        .body(bytes.into())
        .map_err(|e| AppError::Internal(format!("building download response: {}", e)))
}

fn render_form(state: &AppState, error: Option<&str>) -> Result<Html<String>, AppError> {
    let html = IndexTemplate {
        error,
        max_upload_mb: state.config.max_upload_bytes / (1024 * 1024),
    }
    .render()?;
    Ok(Html(html))
}

/// Collect the multipart body into a [`SubmissionForm`].
///
/// Everything is buffered in memory first so that a form failing validation
/// never reaches the disk. Unknown fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<SubmissionForm, AppError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "api_key" {
            let key = field
                .text()
                .await
                .map_err(|e| AppError::Multipart(e.body_text()))?;
            form.api_key = Some(key);
        } else if let Some(role) = DocumentRole::from_field_name(&name) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content = field
                .bytes()
                .await
                .map_err(|e| AppError::Multipart(e.body_text()))?;
            debug!("Received {} '{}' ({} bytes)", role, filename, content.len());
            form.set_document(
                role,
                UploadedDocument {
                    filename,
                    content: content.to_vec(),
                },
            );
        } else {
            debug!("Ignoring unknown form field '{}'", name);
        }
    }

    Ok(form)
}
