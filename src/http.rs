//! HTTP plumbing shared by the embedding providers and the completion client.
//!
//! Maps transport failures and non-success statuses onto [`RagError`] so a
//! credential problem, a quota problem, and a transient outage stay distinct.

use std::time::Duration;

use athena_rag_core::{RagError, Result};
use reqwest::StatusCode;

/// Build a client whose requests are bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Connection(format!("failed to build HTTP client: {e}")))
}

/// Error for a non-success response.
///
/// Prefers the provider's `error.message` field when the body is the usual
/// OpenAI-style JSON error envelope.
pub(crate) fn status_error(status: StatusCode, body: &str) -> RagError {
    let message = error_message(body);
    match status.as_u16() {
        401 | 403 => RagError::Authentication(message),
        429 => RagError::RateLimit(message),
        code => RagError::ApiStatus {
            status: code,
            message,
        },
    }
}

/// Error for a success status whose body is not the expected payload.
///
/// Reported as [`RagError::ApiStatus`] so it is never mistaken for a
/// transient transport failure.
pub(crate) fn invalid_response(
    status: StatusCode,
    operation: &str,
    detail: impl std::fmt::Display,
) -> RagError {
    RagError::ApiStatus {
        status: status.as_u16(),
        message: format!("invalid {operation} response: {detail}"),
    }
}

/// Error for a request that produced no response.
pub(crate) fn transport_error(
    err: reqwest::Error,
    operation: &'static str,
    after: Duration,
) -> RagError {
    if err.is_timeout() {
        RagError::Timeout { operation, after }
    } else {
        RagError::Connection(err.to_string())
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            let error = json.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "(empty response body)".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
