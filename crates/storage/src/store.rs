use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_cursor: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("object {0:?} not found")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn list_page(&self, cursor: Option<String>) -> Result<ListPage, StoreError>;

    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError>;

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Server-side copy within the bucket. A missing source is `NotFound`.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), StoreError>;

    /// Removes all `keys` in one request. Keys that do not exist are ignored.
    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError>;
}
