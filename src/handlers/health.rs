use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub configured: bool,
    pub missing: Vec<&'static str>,
    pub bucket: String,
}

/// Reports whether store calls can be served, without touching the store.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        configured: state.store.is_some(),
        missing: state.missing.clone(),
        bucket: state.bucket.clone(),
    })
}
