//! Error-to-HTTP mapping for the streaming endpoints.
//!
//! The HTTP surface is almost entirely byte-stream responses (`video/mp2t`,
//! playlists); there is no JSON API to speak of, so this module is small: it
//! only has to turn an `AppError` into a status code plus a short plain-text
//! body for the handful of cases that can fail before any bytes are sent.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;

/// Maps an `AppError` to its HTTP response.
///
/// `RedirectCycle`, `FillerExhausted` and `TooManyAttempts` are never passed
/// here — StreamController absorbs them into an in-stream offline item
/// before a handler ever sees them.
pub fn handle_error(error: AppError) -> Response {
    let status = match error.status_code() {
        400 => StatusCode::BAD_REQUEST,
        404 => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(%error, "request failed");
    } else {
        tracing::debug!(%error, "request rejected");
    }

    (status, error.to_string()).into_response()
}
