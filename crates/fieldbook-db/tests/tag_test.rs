//! Integration tests for tags and appointment-tag links.
//!
//! This test suite validates:
//! - Tag names are unique per user, not globally (Scenario C)
//! - Attaching the same tag twice is idempotent, never a duplicate row
//! - Tag listing carries appointment usage counts
//! - Replace-all semantics of set_for_appointment
//!
//! **IMPORTANT**: These tests require a fully migrated PostgreSQL database.
//! Run migrations first: `sqlx migrate run`

use sqlx::Row;
use uuid::Uuid;

use fieldbook_db::test_fixtures::{TestDataBuilder, TestDatabase};
use fieldbook_db::{CreateTagRequest, Error, TagRepository};

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_tag_name_unique_per_user_not_globally() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_user()
        .await
        .build()
        .await;
    let u1 = data.users[0];
    let u2 = data.users[1];
    let name = format!("urgent-visit-{}", Uuid::new_v4());

    db.tags
        .create(CreateTagRequest {
            user_id: u1,
            name: name.clone(),
            color: None,
        })
        .await
        .expect("t1 create");

    // Same user, same name: rejected.
    let dup = db
        .tags
        .create(CreateTagRequest {
            user_id: u1,
            name: name.clone(),
            color: None,
        })
        .await;
    match dup {
        Err(Error::Duplicate(_)) => {}
        other => panic!("Expected Duplicate, got {:?}", other.map(|_| ())),
    }

    // Different user, same name: accepted.
    db.tags
        .create(CreateTagRequest {
            user_id: u2,
            name,
            color: Some("#FF0000".to_string()),
        })
        .await
        .expect("t3 create");

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_duplicate_attach_is_idempotent() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Tagged visit")
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let appointment_id = data.appointments[0];

    let tag_id = db
        .tags
        .create(CreateTagRequest {
            user_id,
            name: format!("repeat-{}", Uuid::new_v4()),
            color: None,
        })
        .await
        .expect("tag create");

    db.tags
        .add_to_appointment(appointment_id, tag_id)
        .await
        .expect("first attach");
    db.tags
        .add_to_appointment(appointment_id, tag_id)
        .await
        .expect("second attach is a no-op");

    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM appointment_tags WHERE appointment_id = $1 AND tag_id = $2",
    )
    .bind(appointment_id)
    .bind(tag_id)
    .fetch_one(db.pool())
    .await
    .expect("pair count");
    let n: i64 = row.get("n");
    assert_eq!(n, 1);

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_list_for_user_counts_usage() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Counted visit")
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let appointment_id = data.appointments[0];

    let used = db
        .tags
        .create(CreateTagRequest {
            user_id,
            name: format!("used-{}", Uuid::new_v4()),
            color: None,
        })
        .await
        .expect("used tag");
    let unused = db
        .tags
        .create(CreateTagRequest {
            user_id,
            name: format!("unused-{}", Uuid::new_v4()),
            color: None,
        })
        .await
        .expect("unused tag");

    db.tags
        .add_to_appointment(appointment_id, used)
        .await
        .expect("attach");

    let listed = db.tags.list_for_user(user_id).await.expect("list");
    let counts: std::collections::HashMap<Uuid, i64> = listed
        .iter()
        .map(|t| (t.tag.id, t.appointment_count))
        .collect();
    assert_eq!(counts[&used], 1);
    assert_eq!(counts[&unused], 0);

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_set_for_appointment_replaces_links() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Relabeled visit")
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let appointment_id = data.appointments[0];

    let mut tag_ids = Vec::new();
    for i in 0..3 {
        let id = db
            .tags
            .create(CreateTagRequest {
                user_id,
                name: format!("set-{}-{}", i, Uuid::new_v4()),
                color: None,
            })
            .await
            .expect("tag create");
        tag_ids.push(id);
    }

    db.tags
        .set_for_appointment(appointment_id, vec![tag_ids[0], tag_ids[1]])
        .await
        .expect("first set");
    db.tags
        .set_for_appointment(appointment_id, vec![tag_ids[2]])
        .await
        .expect("replace set");

    let attached = db
        .tags
        .get_for_appointment(appointment_id)
        .await
        .expect("get");
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].id, tag_ids[2]);

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_invalid_color_rejected() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db).with_user().await.build().await;
    let user_id = data.users[0];

    let result = db
        .tags
        .create(CreateTagRequest {
            user_id,
            name: format!("badcolor-{}", Uuid::new_v4()),
            color: Some("blue".to_string()),
        })
        .await;
    match result {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("Expected InvalidInput, got {:?}", other.map(|_| ())),
    }

    test_db.cleanup(&data).await;
}
