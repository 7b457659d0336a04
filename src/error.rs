//! Error codes and the JSON error envelope returned to browser clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Stable machine-readable code attached to every gateway error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }

    /// Detail safe to show a browser. The full `Display` text stays in logs
    /// because transport errors embed internal upstream URLs.
    fn public_details(&self) -> Option<String> {
        None
    }
}

/// Body of every error response:
/// `{ "error": <user message>, "code": <E_*>, "retryable": <bool>, "details"?: <string> }`.
///
/// `retryable` tells the front-ends whether resending the same request can
/// succeed (timeouts, refused connections).
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Render `err` as a JSON error with the given user-facing message.
pub fn error_response<E: ErrorCode>(status: StatusCode, message: String, err: &E) -> Response {
    let body =
        ErrorBody { error: message, code: err.error_code(), retryable: err.retryable(), details: err.public_details() };
    (status, Json(body)).into_response()
}
