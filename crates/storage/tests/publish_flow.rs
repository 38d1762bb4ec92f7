use bytes::Bytes;
use partnerdesk_core::{prepare, DataKeys, DatasetKind};
use partnerdesk_storage::{
    delete_objects, list_objects, publish, BackupOutcome, MemoryStore, ObjectStatusCache,
    Operation,
};
use regex::Regex;

const ROLODEX_UPLOAD: &str = "Partner\tRegion\n\
=HYPERLINK(\"https://docs.example.com/acme\";\"Acme Corp\")\tEMEA\n\
Globex\tAMER\n";

#[tokio::test]
async fn rolodex_upload_is_transformed_backed_up_and_published() {
    let keys = DataKeys::default();
    let store = MemoryStore::new("partner-data");
    store.insert(keys.rolodex.clone(), "Partner,Region\nOld,EMEA\n");

    let prepared = prepare(DatasetKind::Rolodex, ROLODEX_UPLOAD.as_bytes()).unwrap();
    let destination = DatasetKind::Rolodex.destination_key(&keys);
    let report = publish(&store, Bytes::from(prepared.csv.clone()), destination)
        .await
        .unwrap();

    let pattern = Regex::new(r"^backups/rolodex\.csv_\d{8}_\d{6}\.csv$").unwrap();
    let backup_key = match &report.backup {
        BackupOutcome::Created { key } => key.clone(),
        other => panic!("expected a backup, got {other:?}"),
    };
    assert!(pattern.is_match(&backup_key), "unexpected key {backup_key}");
    assert_eq!(
        store.object(&backup_key).unwrap().body,
        Bytes::from_static(b"Partner,Region\nOld,EMEA\n")
    );

    let published = store.object("rolodex.csv").unwrap();
    assert_eq!(published.content_type, "text/csv");
    let text = String::from_utf8(published.body.to_vec()).unwrap();
    assert_eq!(
        text,
        "Partner,Documentation Link,Region\n\
         Acme Corp,https://docs.example.com/acme,EMEA\n\
         Globex,,AMER\n"
    );
}

#[tokio::test]
async fn first_publish_of_contacts_needs_no_backup() {
    let keys = DataKeys::default();
    let store = MemoryStore::new("partner-data");
    let prepared = prepare(
        DatasetKind::Contacts,
        b"Account Name,Account Owner,Email\nAcme,Jo,jo@acme.test\n",
    )
    .unwrap();
    let report = publish(
        &store,
        Bytes::from(prepared.csv),
        DatasetKind::Contacts.destination_key(&keys),
    )
    .await
    .unwrap();
    assert_eq!(report.backup, BackupOutcome::SourceMissing);
    assert_eq!(list_objects(&store).await.unwrap(), vec!["partnercontacts.csv"]);
}

#[tokio::test]
async fn denied_backup_still_publishes() {
    let store = MemoryStore::new("partner-data");
    store.insert("rolodex.csv", "old");
    store.deny(Operation::Copy);
    let report = publish(&store, Bytes::from_static(b"new"), "rolodex.csv")
        .await
        .unwrap();
    assert!(matches!(report.backup, BackupOutcome::Failed { .. }));
    assert_eq!(
        store.object("rolodex.csv").unwrap().body,
        Bytes::from_static(b"new")
    );
    assert_eq!(list_objects(&store).await.unwrap(), vec!["rolodex.csv"]);
}

#[tokio::test]
async fn deleting_backups_leaves_primaries() {
    let store = MemoryStore::with_page_size("partner-data", 2);
    for key in [
        "rolodex.csv",
        "partnercontacts.csv",
        "backups/rolodex.csv_20240101_000000.csv",
        "backups/rolodex.csv_20240102_000000.csv",
    ] {
        store.insert(key, "x");
    }
    let backups: Vec<String> = list_objects(&store)
        .await
        .unwrap()
        .into_iter()
        .filter(|key| key.starts_with("backups/"))
        .collect();
    assert_eq!(delete_objects(&store, &backups).await.unwrap(), 2);
    assert_eq!(
        list_objects(&store).await.unwrap(),
        vec!["partnercontacts.csv", "rolodex.csv"]
    );
}

#[tokio::test]
async fn status_reflects_publish_after_invalidation() {
    let store = MemoryStore::new("partner-data");
    let cache = ObjectStatusCache::default();
    assert!(cache.status(&store, "rolodex.csv").await.contains("not found"));
    publish(&store, Bytes::from_static(b"a\n"), "rolodex.csv")
        .await
        .unwrap();
    cache.invalidate("rolodex.csv");
    assert!(cache
        .status(&store, "rolodex.csv")
        .await
        .starts_with("Last updated: "));
}
