use super::{resolve_content_type, ObjectListing, ObjectStore, ObjectSummary, PresignedUrl};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// In-process object store. Issues `memory://` URLs and can serve transfers
/// against them, which stands in for a browser talking to a real store.
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
    presign_ttl: Duration,
    clock: Clock,
}

/// The parts of a URL previously issued by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct IssuedUrl {
    bucket: String,
    key: String,
    method: String,
    expires: i64,
    content_type: Option<String>,
}

impl MemoryStore {
    pub fn new(presign_ttl: Duration) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            presign_ttl,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the wall clock, for reproducible expiry times.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
    }

    pub async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let content_type = resolve_content_type(key, None);
        self.insert(bucket, key, data, content_type).await
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .ok_or_else(no_such_bucket)?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Store("NoSuchKey: The specified key does not exist.".into()))
    }

    /// Performs the PUT a client would send to a URL from `presign_upload`.
    pub async fn put_presigned(&self, url: &str, data: Bytes) -> Result<()> {
        let issued = self.verify(url, "PUT")?;
        let content_type = issued
            .content_type
            .unwrap_or_else(|| resolve_content_type(&issued.key, None));
        self.insert(&issued.bucket, &issued.key, data, content_type).await
    }

    /// Performs the GET a client would send to a URL from `presign_download`.
    pub async fn get_presigned(&self, url: &str) -> Result<Bytes> {
        let issued = self.verify(url, "GET")?;
        Ok(self.get_object(&issued.bucket, &issued.key).await?.data)
    }

    async fn insert(&self, bucket: &str, key: &str, data: Bytes, content_type: String) -> Result<()> {
        let last_modified = (self.clock)();
        let mut buckets = self.buckets.write().await;
        buckets.get_mut(bucket).ok_or_else(no_such_bucket)?.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type,
                last_modified,
            },
        );
        Ok(())
    }

    fn issue(&self, bucket: &str, key: &str, method: &str, content_type: Option<&str>) -> Result<PresignedUrl> {
        let ttl = chrono::Duration::from_std(self.presign_ttl).map_err(|e| Error::Presign(e.to_string()))?;
        let expires_at = (self.clock)() + ttl;

        let mut url = format!(
            "memory://{}/{}?method={}&expires={}",
            bucket,
            urlencoding::encode(key),
            method,
            expires_at.timestamp()
        );
        if let Some(content_type) = content_type {
            url.push_str("&content-type=");
            url.push_str(&urlencoding::encode(content_type));
        }

        Ok(PresignedUrl { url, expires_at })
    }

    fn verify(&self, url: &str, method: &str) -> Result<IssuedUrl> {
        let issued = parse_issued_url(url)
            .ok_or_else(|| Error::Store(format!("AccessDenied: not a URL issued by this store: {}", url)))?;

        if issued.method != method {
            return Err(Error::Store(format!(
                "SignatureDoesNotMatch: URL was signed for {}, not {}",
                issued.method, method
            )));
        }
        if (self.clock)().timestamp() > issued.expires {
            return Err(Error::Store("AccessDenied: Request has expired".into()));
        }

        Ok(issued)
    }
}

fn no_such_bucket() -> Error {
    Error::Store("NoSuchBucket: The specified bucket does not exist".into())
}

fn parse_issued_url(url: &str) -> Option<IssuedUrl> {
    let (path, query) = url.strip_prefix("memory://")?.split_once('?')?;
    let (bucket, key) = path.split_once('/')?;

    let mut method = None;
    let mut expires = None;
    let mut content_type = None;
    for pair in query.split('&') {
        match pair.split_once('=')? {
            ("method", value) => method = Some(value.to_string()),
            ("expires", value) => expires = value.parse().ok(),
            ("content-type", value) => content_type = Some(urlencoding::decode(value).ok()?.into_owned()),
            _ => {}
        }
    }

    Some(IssuedUrl {
        bucket: bucket.to_string(),
        key: urlencoding::decode(key).ok()?.into_owned(),
        method: method?,
        expires: expires?,
        content_type,
    })
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, bucket: &str, max_keys: usize) -> Result<ObjectListing> {
        let buckets = self.buckets.read().await;
        let objects = buckets.get(bucket).ok_or_else(no_such_bucket)?;

        Ok(ObjectListing {
            objects: objects
                .iter()
                .take(max_keys)
                .map(|(key, object)| ObjectSummary {
                    key: key.clone(),
                    size: object.data.len() as u64,
                    last_modified: Some(object.last_modified),
                })
                .collect(),
            truncated: objects.len() > max_keys,
        })
    }

    async fn presign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<PresignedUrl> {
        let content_type = resolve_content_type(key, content_type);
        self.issue(bucket, key, "PUT", Some(&content_type))
    }

    async fn presign_download(&self, bucket: &str, key: &str) -> Result<PresignedUrl> {
        self.issue(bucket, key, "GET", None)
    }
}
