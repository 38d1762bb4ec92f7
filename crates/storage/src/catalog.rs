use thiserror::Error;
use tracing::info;

use crate::store::{ObjectStore, StoreError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("could not list files in bucket {bucket}: {source}")]
    List {
        bucket: String,
        #[source]
        source: StoreError,
    },
    #[error("deletion failed: {0}")]
    Delete(#[source] StoreError),
    #[error("no files selected for deletion")]
    EmptySelection,
}

pub async fn list_objects(store: &dyn ObjectStore) -> Result<Vec<String>, CatalogError> {
    let mut keys = Vec::new();
    let mut cursor = None;
    let mut pages = 0usize;
    loop {
        let page = store
            .list_page(cursor.take())
            .await
            .map_err(|source| CatalogError::List {
                bucket: store.bucket().to_string(),
                source,
            })?;
        pages += 1;
        keys.extend(page.keys);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    info!(bucket = store.bucket(), pages, objects = keys.len(), "listed_objects");
    Ok(keys)
}

pub async fn delete_objects(
    store: &dyn ObjectStore,
    keys: &[String],
) -> Result<usize, CatalogError> {
    if keys.is_empty() {
        return Err(CatalogError::EmptySelection);
    }
    store.delete_many(keys).await.map_err(CatalogError::Delete)?;
    info!(bucket = store.bucket(), deleted = keys.len(), "deleted_objects");
    Ok(keys.len())
}
