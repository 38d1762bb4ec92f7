use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::store::{ListPage, ObjectMeta, ObjectStore, StoreError};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Head,
    Put,
    Copy,
    Delete,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

pub struct MemoryStore {
    bucket: String,
    page_size: usize,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    denied: Mutex<HashSet<Operation>>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self::with_page_size(bucket, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(bucket: impl Into<String>, page_size: usize) -> Self {
        Self {
            bucket: bucket.into(),
            page_size: page_size.max(1),
            objects: Mutex::new(BTreeMap::new()),
            denied: Mutex::new(HashSet::new()),
        }
    }

    /// Makes every later call of `op` fail with `AccessDenied`.
    pub fn deny(&self, op: Operation) {
        self.denied.lock().insert(op);
    }

    pub fn allow(&self, op: Operation) {
        self.denied.lock().remove(&op);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.objects.lock().insert(
            key.into(),
            StoredObject {
                body: body.into(),
                content_type: "application/octet-stream".to_string(),
                last_modified: Utc::now(),
            },
        );
    }

    fn check(&self, op: Operation) -> Result<(), StoreError> {
        if self.denied.lock().contains(&op) {
            return Err(StoreError::AccessDenied(format!(
                "{op:?} is not permitted on bucket {}",
                self.bucket
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(&self, cursor: Option<String>) -> Result<ListPage, StoreError> {
        self.check(Operation::List)?;
        let objects = self.objects.lock();
        let lower = match &cursor {
            Some(after) => Bound::Excluded(after.clone()),
            None => Bound::Unbounded,
        };
        let mut remaining = objects.range((lower, Bound::Unbounded)).map(|(k, _)| k);
        let keys: Vec<String> = remaining.by_ref().take(self.page_size).cloned().collect();
        let next_cursor = match remaining.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };
        Ok(ListPage { keys, next_cursor })
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        self.check(Operation::Head)?;
        let objects = self.objects.lock();
        let object = objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(ObjectMeta {
            key: key.to_string(),
            last_modified: Some(object.last_modified),
            size: object.body.len() as u64,
        })
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.check(Operation::Put)?;
        self.objects.lock().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), StoreError> {
        self.check(Operation::Copy)?;
        let mut objects = self.objects.lock();
        let mut copied = objects
            .get(source)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(source.to_string()))?;
        copied.last_modified = Utc::now();
        objects.insert(destination.to_string(), copied);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        self.check(Operation::Delete)?;
        let mut objects = self.objects.lock();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listing_pages_through_keys_in_order() {
        let store = MemoryStore::with_page_size("bucket", 2);
        for key in ["c", "a", "b"] {
            store.insert(key, "x");
        }
        let first = store.list_page(None).await.unwrap();
        assert_eq!(first.keys, vec!["a", "b"]);
        assert_eq!(first.next_cursor.as_deref(), Some("b"));
        let second = store.list_page(first.next_cursor).await.unwrap();
        assert_eq!(second.keys, vec!["c"]);
        assert_eq!(second.next_cursor, None);
    }

    #[tokio::test]
    async fn copy_of_missing_source_is_not_found() {
        let store = MemoryStore::new("bucket");
        let err = store.copy("nope.csv", "backup.csv").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn denied_operations_fail() {
        let store = MemoryStore::new("bucket");
        store.deny(Operation::Put);
        let err = store
            .put("a.csv", Bytes::from_static(b"x"), "text/csv")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));
        store.allow(Operation::Put);
        store
            .put("a.csv", Bytes::from_static(b"x"), "text/csv")
            .await
            .unwrap();
    }
}
