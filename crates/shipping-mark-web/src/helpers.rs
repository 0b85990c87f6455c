//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Result` types into JSON error
//! responses, reducing boilerplate in routes.

use axum::{
    Json,
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use serde::Serialize;
use tracing::{error, warn};

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error half of a route result.
pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorBody { error: message }))
}

/// Extension trait for converting core results to `RouteResult<T>`.
///
/// Request problems become 400 with the error message; all other failures
/// are logged and become 500.
pub trait CoreResultExt<T> {
    fn or_api_error(self) -> RouteResult<T>;
}

impl<T> CoreResultExt<T> for shipping_mark_core::Result<T> {
    fn or_api_error(self) -> RouteResult<T> {
        self.map_err(|e| {
            if e.is_client_error() {
                warn!("Rejected request: {}", e);
                api_error(StatusCode::BAD_REQUEST, e.to_string())
            } else {
                error!("Label generation failed: {:?}", e);
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("processing failed: {e}"),
                )
            }
        })
    }
}

/// Extension trait for converting any `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| {
            error!("Internal error: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
    }
}

/// How the browser should present a PDF response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

/// `Content-Disposition` value with an ASCII fallback name and the
/// RFC 5987 UTF-8 name.
pub fn content_disposition(disposition: Disposition, file_name: &str) -> String {
    let kind = match disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("{kind}; filename=\"{file_name}\"")
    } else {
        format!(
            "{kind}; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(file_name)
        )
    }
}

/// `application/pdf` response.
pub fn pdf_response(
    bytes: Vec<u8>,
    disposition: Disposition,
    file_name: &str,
) -> RouteResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, file_name),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(bytes))
        .or_internal_error()
}
