pub mod memory;
pub mod s3;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Upper bound of a single listing page. No continuation token is followed.
pub const MAX_KEYS: usize = 1000;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One entry of a bucket listing. Field names match what the browser client
/// reads (`Key`, `Size`, `LastModified`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub objects: Vec<ObjectSummary>,
    /// Set when the store holds more objects than were returned.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects(&self, bucket: &str, max_keys: usize) -> Result<ObjectListing>;

    async fn presign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<PresignedUrl>;

    async fn presign_download(&self, bucket: &str, key: &str) -> Result<PresignedUrl>;
}

/// Content type for an upload: an explicit non-empty value, else a guess from
/// the key's extension, else `application/octet-stream`.
pub fn resolve_content_type(key: &str, explicit: Option<&str>) -> String {
    match explicit.filter(|content_type| !content_type.is_empty()) {
        Some(content_type) => content_type.to_string(),
        None => mime_guess::from_path(key)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    }
}
