pub mod catalog;
pub mod memory;
pub mod publish;
pub mod s3;
pub mod status;
pub mod store;

pub use catalog::{delete_objects, list_objects, CatalogError};
pub use memory::{MemoryStore, Operation, StoredObject};
pub use publish::{
    backup_key, publish, publish_at, BackupOutcome, Notice, NoticeLevel, PublishError,
    PublishReport, BACKUP_PREFIX,
};
pub use s3::{load_sdk_config, S3Store};
pub use status::{describe_object, ObjectStatusCache, DEFAULT_STATUS_TTL};
pub use store::{ListPage, ObjectMeta, ObjectStore, StoreError, CSV_CONTENT_TYPE};
