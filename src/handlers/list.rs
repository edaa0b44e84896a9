use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::bounded;
use crate::{
    error::Result,
    server::AppState,
    storage::{ObjectSummary, MAX_KEYS},
};

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<ObjectSummary>,
}

pub async fn list_objects(State(state): State<Arc<AppState>>) -> Result<Json<ListResponse>> {
    let store = state.store()?;

    info!(bucket = %state.bucket, "Listing objects");
    let listing = bounded(state.request_timeout, store.list_objects(&state.bucket, MAX_KEYS)).await?;

    if listing.truncated {
        warn!(
            bucket = %state.bucket,
            returned = listing.objects.len(),
            "Bucket holds more than {} objects, only the first page is listed",
            MAX_KEYS
        );
    }

    Ok(Json(ListResponse {
        items: listing.objects,
    }))
}
