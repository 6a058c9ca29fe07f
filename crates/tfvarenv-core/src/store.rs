//! Object store abstraction
//!
//! The ledgers and workflows only talk to the bucket through this trait,
//! so they can run against S3 or an in-memory store.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Versioned object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, optionally a specific version. `Ok(None)` when absent.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<Option<StoredObject>>;

    /// Store a new object version
    async fn put_object(&self, request: PutObject) -> Result<PutOutput>;

    /// Fails unless versioning is enabled on the bucket
    async fn check_versioning(&self, bucket: &str) -> Result<()>;

    /// Native versions of one key, newest first
    async fn list_versions(
        &self,
        bucket: &str,
        key: &str,
        limit: usize,
    ) -> Result<Vec<ObjectVersion>>;

    /// Account id of the current credentials
    async fn caller_account_id(&self) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub version_id: Option<String>,
    pub metadata: HashMap<String, String>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl PutObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            content,
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PutOutput {
    /// `None` when the bucket is not versioned
    pub version_id: Option<String>,
    pub etag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectVersion {
    pub version_id: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
    pub is_latest: bool,
}
