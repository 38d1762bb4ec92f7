use bytes::Bytes;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{ObjectStore, StoreError, CSV_CONTENT_TYPE};

pub const BACKUP_PREFIX: &str = "backups/";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to upload {key}: {source}")]
pub struct PublishError {
    pub key: String,
    #[source]
    pub source: StoreError,
}

/// Result of the backup step. Only the final put decides success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackupOutcome {
    Created { key: String },
    SourceMissing,
    Failed { reason: String },
}

impl BackupOutcome {
    pub fn backup_key(&self) -> Option<&str> {
        match self {
            BackupOutcome::Created { key } => Some(key),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub destination: String,
    pub backup: BackupOutcome,
    pub bytes_written: usize,
    pub notices: Vec<Notice>,
}

pub fn backup_key(destination: &str, now: NaiveDateTime) -> String {
    let basename = destination.rsplit('/').next().unwrap_or(destination);
    format!(
        "{BACKUP_PREFIX}{basename}_{}.csv",
        now.format("%Y%m%d_%H%M%S")
    )
}

pub async fn publish(
    store: &dyn ObjectStore,
    body: Bytes,
    destination: &str,
) -> Result<PublishReport, PublishError> {
    publish_at(store, body, destination, Local::now()).await
}

pub async fn publish_at(
    store: &dyn ObjectStore,
    body: Bytes,
    destination: &str,
    now: DateTime<Local>,
) -> Result<PublishReport, PublishError> {
    let mut notices = Vec::new();
    let candidate = backup_key(destination, now.naive_local());

    notices.push(Notice::new(
        NoticeLevel::Info,
        format!("Backing up existing '{destination}'..."),
    ));
    let backup = match store.copy(destination, &candidate).await {
        Ok(()) => {
            info!(bucket = store.bucket(), destination, backup = %candidate, "backup_created");
            BackupOutcome::Created { key: candidate }
        }
        Err(StoreError::NotFound(_)) => {
            info!(bucket = store.bucket(), destination, "backup_skipped_no_source");
            notices.push(Notice::new(
                NoticeLevel::Warning,
                format!("No existing file for '{destination}'. A backup was not created."),
            ));
            BackupOutcome::SourceMissing
        }
        Err(err) => {
            warn!(bucket = store.bucket(), destination, error = %err, "backup_failed");
            notices.push(Notice::new(
                NoticeLevel::Warning,
                format!("Could not create backup for '{destination}': {err}"),
            ));
            BackupOutcome::Failed {
                reason: err.to_string(),
            }
        }
    };

    notices.push(Notice::new(
        NoticeLevel::Info,
        format!("Uploading transformed file to '{destination}'..."),
    ));
    let bytes_written = body.len();
    store
        .put(destination, body, CSV_CONTENT_TYPE)
        .await
        .map_err(|source| PublishError {
            key: destination.to_string(),
            source,
        })?;
    info!(bucket = store.bucket(), destination, bytes_written, "published");
    notices.push(Notice::new(
        NoticeLevel::Success,
        format!("Successfully uploaded transformed data to `{destination}`."),
    ));

    Ok(PublishReport {
        destination: destination.to_string(),
        backup,
        bytes_written,
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    use crate::memory::{MemoryStore, Operation};

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 5, 14, 7, 9)
            .single()
            .unwrap()
    }

    #[test]
    fn backup_key_uses_basename_and_timestamp() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap();
        assert_eq!(
            backup_key("rolodex.csv", now),
            "backups/rolodex.csv_20240305_140709.csv"
        );
        assert_eq!(
            backup_key("data/partners/contacts.csv", now),
            "backups/contacts.csv_20240305_140709.csv"
        );
    }

    #[tokio::test]
    async fn existing_object_is_backed_up_before_overwrite() {
        let store = MemoryStore::new("bucket");
        store.insert("rolodex.csv", "old");
        let report = publish_at(&store, Bytes::from_static(b"new"), "rolodex.csv", fixed_time())
            .await
            .unwrap();
        assert_eq!(
            report.backup,
            BackupOutcome::Created {
                key: "backups/rolodex.csv_20240305_140709.csv".into()
            }
        );
        let backup = store.object("backups/rolodex.csv_20240305_140709.csv").unwrap();
        assert_eq!(backup.body, Bytes::from_static(b"old"));
        let current = store.object("rolodex.csv").unwrap();
        assert_eq!(current.body, Bytes::from_static(b"new"));
        assert_eq!(current.content_type, "text/csv");
        assert_eq!(report.bytes_written, 3);
    }

    #[tokio::test]
    async fn first_publish_reports_missing_source() {
        let store = MemoryStore::new("bucket");
        let report = publish_at(&store, Bytes::from_static(b"a\n"), "rolodex.csv", fixed_time())
            .await
            .unwrap();
        assert_eq!(report.backup, BackupOutcome::SourceMissing);
        assert_eq!(store.keys(), vec!["rolodex.csv"]);
        assert!(report
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Warning && n.message.contains("not created")));
        assert_eq!(report.notices.last().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn failed_backup_does_not_block_upload() {
        let store = MemoryStore::new("bucket");
        store.insert("rolodex.csv", "old");
        store.deny(Operation::Copy);
        let report = publish_at(&store, Bytes::from_static(b"new"), "rolodex.csv", fixed_time())
            .await
            .unwrap();
        assert!(matches!(report.backup, BackupOutcome::Failed { .. }));
        assert_eq!(report.backup.backup_key(), None);
        assert_eq!(store.object("rolodex.csv").unwrap().body, Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn failed_put_is_an_error() {
        let store = MemoryStore::new("bucket");
        store.insert("rolodex.csv", "old");
        store.deny(Operation::Put);
        let err = publish_at(&store, Bytes::from_static(b"new"), "rolodex.csv", fixed_time())
            .await
            .unwrap_err();
        assert_eq!(err.key, "rolodex.csv");
        assert!(matches!(err.source, StoreError::AccessDenied(_)));
        // the backup step already ran; there is no rollback
        assert!(store
            .object("backups/rolodex.csv_20240305_140709.csv")
            .is_some());
        assert_eq!(store.object("rolodex.csv").unwrap().body, Bytes::from_static(b"old"));
    }
}
