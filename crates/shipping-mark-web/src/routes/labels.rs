//! Label routes - combined document generation and single-page preview.

use axum::{
    extract::{Form, State},
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::form::{FormFields, generation_job, preview_job};
use crate::helpers::{CoreResultExt, Disposition, ResultExt, RouteResult, pdf_response};
use crate::state::AppState;

/// Generate the combined label PDF as a download.
///
/// The batch loop runs on a blocking worker thread.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormFields>,
) -> RouteResult<Response> {
    let generator = state.generator().clone();
    let job = generation_job(generator.profiles(), &form).or_api_error()?;
    debug!("generate: profile={}, batches={}", job.profile, job.batches.len());

    let document = tokio::task::spawn_blocking(move || generator.generate(&job))
        .await
        .or_internal_error()?
        .or_api_error()?;

    info!(
        "Generated {} ({} pages, {} bytes)",
        document.file_name,
        document.page_count,
        document.pdf_bytes.len()
    );
    pdf_response(document.pdf_bytes, Disposition::Attachment, &document.file_name)
}

/// Render the first page of the first batch for inline display.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormFields>,
) -> RouteResult<Response> {
    let generator = state.generator().clone();
    let job = preview_job(generator.profiles(), &form).or_api_error()?;
    debug!("preview: profile={}", job.profile);

    let document = tokio::task::spawn_blocking(move || generator.preview(&job))
        .await
        .or_internal_error()?
        .or_api_error()?;

    pdf_response(document.pdf_bytes, Disposition::Inline, &document.file_name)
}
