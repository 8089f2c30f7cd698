//! Operational HTTP endpoints.
//!
//! - `/healthz`              : liveness
//! - `/api/v1/metrics.json`  : registry as a JSON array, newline-terminated
//! - `/api/v1/metrics.txt`   : registry as `name value` lines

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use vitals_core::error::VitalsError;
use vitals_core::text;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics_json(State(state): State<AppState>) -> Response {
    state.count_request();
    match state.metrics().to_json_bytes() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

pub async fn metrics_text(State(state): State<AppState>) -> Response {
    state.count_request();
    match text::to_text(&state.metrics()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

fn internal(e: VitalsError) -> Response {
    tracing::error!(code = e.code(), error = %e, "metrics encoding failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}
