//! Replacement integration tests: saving a record that supersedes another.
//!
//! Run with: `cargo test -p filestore-services --test replacement_test`

mod helpers;

use filestore_core::UploadFacts;
use filestore_db::StorageRecordRepository;
use filestore_services::{AFTER_DELETE, AFTER_SAVE, BEFORE_SAVE};
use helpers::{new_record, setup};

#[tokio::test]
async fn test_create_with_replaces_id_deletes_old_record() {
    let h = setup().await;
    let old = h
        .service
        .create(new_record("1", "v1.pdf"), &UploadFacts::none(), None)
        .await
        .unwrap()
        .report()
        .unwrap()
        .record
        .clone();

    let outcome = h
        .service
        .create(new_record("1", "v2.pdf"), &UploadFacts::none(), Some(old.id))
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert!(report.replaced);
    assert!(h.repository.find_by_id(old.id).await.unwrap().is_none());
    assert!(h
        .repository
        .find_by_id(report.record.id)
        .await
        .unwrap()
        .is_some());
    assert_eq!(h.storage.deleted_paths(), vec![old.path.clone()]);

    // New record is announced before the old one is torn down.
    let names = h.recorder.names();
    assert_eq!(
        &names[2..],
        &[
            BEFORE_SAVE.to_string(),
            AFTER_SAVE.to_string(),
            AFTER_DELETE.to_string()
        ]
    );
}

#[tokio::test]
async fn test_failed_replacement_keeps_new_record() {
    let h = setup().await;
    let old = h
        .service
        .create(new_record("1", "v1.pdf"), &UploadFacts::none(), None)
        .await
        .unwrap()
        .report()
        .unwrap()
        .record
        .clone();
    h.storage.fail_deletes(true);

    let outcome = h
        .service
        .create(new_record("1", "v2.pdf"), &UploadFacts::none(), Some(old.id))
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert!(!report.replaced);
    assert!(h
        .repository
        .find_by_id(report.record.id)
        .await
        .unwrap()
        .is_some());
    assert_eq!(h.storage.deleted_paths(), vec![old.path.clone()]);
}

#[tokio::test]
async fn test_update_with_replaces_id() {
    let h = setup().await;
    let old = h
        .service
        .create(new_record("1", "v1.pdf"), &UploadFacts::none(), None)
        .await
        .unwrap()
        .report()
        .unwrap()
        .record
        .clone();
    let current = h
        .service
        .create(new_record("1", "v2.pdf"), &UploadFacts::none(), None)
        .await
        .unwrap()
        .report()
        .unwrap()
        .record
        .clone();

    let outcome = h
        .service
        .update(current.clone(), &UploadFacts::none(), Some(old.id))
        .await
        .unwrap();

    assert!(outcome.report().unwrap().replaced);
    let remaining = h.repository.find_by_owner("users", "1").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, current.id);
}
