use super::{resolve_content_type, ObjectListing, ObjectStore, ObjectSummary, PresignedUrl};
use crate::{
    config::S3Config,
    error::{Error, Result},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::DateTime as SmithyDateTime,
    types::Object,
    Client,
};
use chrono::{DateTime, SubsecRound, Utc};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Object store backed by any S3-compatible service through the AWS SDK.
pub struct S3Store {
    client: Client,
    presign_ttl: Duration,
}

impl S3Store {
    pub fn new(config: &S3Config) -> Result<Self> {
        let (Some(endpoint), Some(access_key_id), Some(secret_access_key)) = (
            config.endpoint.as_deref(),
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
        ) else {
            return Err(Error::NotConfigured {
                missing: config.missing(),
            });
        };

        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "bucketdrop");

        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version_latest()
            .endpoint_url(endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            presign_ttl: config.presign_ttl(),
        })
    }

    /// Signing window starting at `issued_at`, so the reported expiry matches
    /// the one embedded in the signature. `X-Amz-Date` carries whole seconds.
    fn presigning(&self, issued_at: DateTime<Utc>) -> Result<(PresigningConfig, DateTime<Utc>)> {
        let issued_at = issued_at.trunc_subsecs(0);
        let presigning = PresigningConfig::builder()
            .start_time(SystemTime::from(issued_at))
            .expires_in(self.presign_ttl)
            .build()
            .map_err(|e| Error::Presign(e.to_string()))?;

        let ttl = chrono::Duration::from_std(self.presign_ttl).map_err(|e| Error::Presign(e.to_string()))?;
        Ok((presigning, issued_at + ttl))
    }
}

fn store_error<E: std::error::Error>(err: E) -> Error {
    Error::Store(DisplayErrorContext(err).to_string())
}

fn to_chrono(timestamp: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

fn summarize(object: &Object) -> ObjectSummary {
    ObjectSummary {
        key: object.key().unwrap_or_default().to_string(),
        size: u64::try_from(object.size().unwrap_or_default()).unwrap_or_default(),
        last_modified: object.last_modified().and_then(to_chrono),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_objects(&self, bucket: &str, max_keys: usize) -> Result<ObjectListing> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(store_error)?;

        let objects = output.contents().iter().map(summarize).collect();

        Ok(ObjectListing {
            objects,
            truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn presign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<PresignedUrl> {
        let content_type = resolve_content_type(key, content_type);
        let (presigning, expires_at) = self.presigning(Utc::now())?;

        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(&content_type)
            .presigned(presigning)
            .await
            .map_err(store_error)?;

        debug!(bucket, key, content_type = %content_type, "Signed PUT request");

        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_at,
        })
    }

    async fn presign_download(&self, bucket: &str, key: &str) -> Result<PresignedUrl> {
        let (presigning, expires_at) = self.presigning(Utc::now())?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(store_error)?;

        debug!(bucket, key, "Signed GET request");

        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_at,
        })
    }
}
