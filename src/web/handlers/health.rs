//! Liveness/readiness probes. The core has no database or external
//! dependency to ping — readiness only needs the encoder executable to
//! actually be on disk.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::web::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "ffmpeg": state.encoder_available(),
    }))
}

/// Readiness: ffmpeg must be resolvable on `PATH`, otherwise every stream
/// request would fail with `EncoderMissing`.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.encoder_available() {
        (StatusCode::OK, Json(json!({"status": "ready"}))).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "not ready", "reason": "encoder executable not found"}))).into_response()
    }
}

pub async fn liveness_check() -> impl IntoResponse {
    Json(json!({"status": "alive"}))
}
