//! Axum router wiring.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/api/v1/metrics.json", get(ops::metrics_json))
        .route("/api/v1/metrics.txt", get(ops::metrics_text))
        .with_state(state)
}
