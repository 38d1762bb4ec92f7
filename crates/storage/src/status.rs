use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::store::{ObjectStore, StoreError};

pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(300);

pub async fn describe_object(store: &dyn ObjectStore, key: &str) -> String {
    match store.head(key).await {
        Ok(meta) => match meta.last_modified {
            Some(ts) => format!("Last updated: {}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
            None => "Last updated: unknown".to_string(),
        },
        Err(StoreError::NotFound(_)) => format!("Error: File '{key}' not found in S3."),
        Err(StoreError::AccessDenied(_)) => format!(
            "Error: Permission denied for '{key}'. Ensure user has 's3:HeadObject' permission."
        ),
        Err(StoreError::Backend(message)) => {
            format!("An S3 client error occurred: {message}")
        }
    }
}

struct Entry {
    line: String,
    fetched: Instant,
}

pub struct ObjectStatusCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ObjectStatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn status(&self, store: &dyn ObjectStore, key: &str) -> String {
        if let Some(entry) = self.entries.lock().get(key) {
            if entry.fetched.elapsed() < self.ttl {
                return entry.line.clone();
            }
        }
        let line = describe_object(store, key).await;
        debug!(key, status = %line, "status_refreshed");
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                line: line.clone(),
                fetched: Instant::now(),
            },
        );
        line
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

impl Default for ObjectStatusCache {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TTL)
    }
}
