//! Translation of HTTP responses into API errors and outcome classes.
//!
//! Transport failures are classified by `From<reqwest::Error>` for
//! [`datera_core::Error`]: refused connections become
//! [`Error::ConnectionRefused`](datera_core::Error::ConnectionRefused) and
//! everything else is propagated unclassified.

use datera_core::{ApiErrorResponse, Outcome};
use tracing::error;

/// Decode a failed response body into an API error.
///
/// The `http` field falls back to `status` when the body omits it. A body that
/// cannot be decoded is logged and kept verbatim as the error message.
#[must_use]
pub fn decode_error_body(status: u16, body: &str) -> ApiErrorResponse {
    let mut response = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(response) => response,
        Err(err) => {
            error!(status, %err, body, "Failed to decode Datera error response");
            ApiErrorResponse {
                message: body.to_string(),
                ..ApiErrorResponse::default()
            }
        }
    };
    if response.http == 0 {
        response.http = status;
    }
    response
}

/// Classify a completed HTTP exchange.
///
/// Returns `None` for success statuses, otherwise the decoded API error paired
/// with its outcome class (if the status has one).
#[must_use]
pub fn translate_errors(status: u16, body: &str) -> Option<(ApiErrorResponse, Option<Outcome>)> {
    if (200..300).contains(&status) {
        return None;
    }
    let response = decode_error_body(status, body);
    let outcome = Outcome::from_status(status);
    Some((response, outcome))
}
