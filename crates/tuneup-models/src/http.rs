//! Shared HTTP helpers.

use reqwest::{Response, StatusCode};
use tuneup_training::TrainingError;

/// Map a non-success response into a transport error carrying the body.
pub(crate) async fn error_from_response(response: Response, operation: &str) -> TrainingError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    map_http_error(status, &error_text, operation)
}

pub(crate) fn map_http_error(status: StatusCode, body: &str, operation: &str) -> TrainingError {
    let body = body.trim();
    let detail = if body.is_empty() { "no response body" } else { body };
    TrainingError::Transport(format!("{operation} failed with HTTP {}: {detail}", status.as_u16()))
}

pub(crate) fn request_error(operation: &str, error: &reqwest::Error) -> TrainingError {
    TrainingError::Transport(format!("{operation}: {error}"))
}
