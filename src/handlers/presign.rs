use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::bounded;
use crate::{
    error::{Error, Result},
    server::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignUploadRequest {
    pub key: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PresignDownloadRequest {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PresignResponse {
    pub url: String,
}

fn required_key(key: Option<String>) -> Result<String> {
    key.filter(|key| !key.is_empty()).ok_or(Error::KeyRequired)
}

// An absent or unparseable body is handled like one without a key.
pub async fn presign_upload(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PresignUploadRequest>>,
) -> Result<Json<PresignResponse>> {
    let store = state.store()?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let key = required_key(request.key)?;

    info!(bucket = %state.bucket, key = %key, "Presign upload");
    let presigned = bounded(
        state.request_timeout,
        store.presign_upload(&state.bucket, &key, request.content_type.as_deref()),
    )
    .await?;
    debug!(url = %presigned.url, expires_at = %presigned.expires_at, "Presigned upload URL");

    Ok(Json(PresignResponse { url: presigned.url }))
}

pub async fn presign_download(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PresignDownloadRequest>>,
) -> Result<Json<PresignResponse>> {
    let store = state.store()?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let key = required_key(request.key)?;

    info!(bucket = %state.bucket, key = %key, "Presign download");
    let presigned = bounded(state.request_timeout, store.presign_download(&state.bucket, &key)).await?;
    debug!(url = %presigned.url, expires_at = %presigned.expires_at, "Presigned download URL");

    Ok(Json(PresignResponse { url: presigned.url }))
}
