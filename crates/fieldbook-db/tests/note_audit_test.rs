//! Integration tests for notes and the audit trail.
//!
//! This test suite validates:
//! - Notes list per appointment in creation order
//! - Attachment URLs are validated at the application boundary
//! - A note cannot reference a missing appointment
//! - Activity log listing is newest-first and paginated
//!
//! **IMPORTANT**: These tests require a fully migrated PostgreSQL database.
//! Run migrations first: `sqlx migrate run`

use serde_json::json;
use uuid::Uuid;

use fieldbook_db::test_fixtures::{TestDataBuilder, TestDatabase};
use fieldbook_db::{
    ActivityLogRepository, CreateNoteRequest, Error, NoteRepository, NoteType,
    RecordActivityRequest,
};

fn note_request(appointment_id: Uuid, user_id: Uuid, content: &str) -> CreateNoteRequest {
    CreateNoteRequest {
        appointment_id,
        user_id,
        note_type: NoteType::DuringAppointment,
        content: content.to_string(),
        attachments: vec![],
        is_important: false,
    }
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_notes_list_in_creation_order() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Noted visit")
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let appointment_id = data.appointments[0];

    for content in ["arrived", "spoke to manager", "left samples"] {
        db.notes
            .insert(note_request(appointment_id, user_id, content))
            .await
            .expect("note insert");
    }

    let notes = db
        .notes
        .list_for_appointment(appointment_id)
        .await
        .expect("list");
    let contents: Vec<&str> = notes.iter().map(|n| n.content.as_str()).collect();
    assert_eq!(contents, ["arrived", "spoke to manager", "left samples"]);

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_note_attachment_urls_validated() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Attachment visit")
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let appointment_id = data.appointments[0];

    let mut req = note_request(appointment_id, user_id, "with photo");
    req.attachments = vec!["not-a-url".to_string()];
    match db.notes.insert(req).await {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("Expected InvalidInput, got {:?}", other.map(|_| ())),
    }

    let mut req = note_request(appointment_id, user_id, "with photo");
    req.attachments = vec![
        "https://cdn.example.com/front.jpg".to_string(),
        "https://cdn.example.com/back.jpg".to_string(),
    ];
    let note_id = db.notes.insert(req).await.expect("valid attachments");

    let note = db.notes.fetch(note_id).await.expect("fetch");
    assert_eq!(note.attachments.len(), 2);
    assert_eq!(note.attachments[0], "https://cdn.example.com/front.jpg");

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_note_for_missing_appointment_rejected() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db).with_user().await.build().await;
    let user_id = data.users[0];

    match db
        .notes
        .insert(note_request(Uuid::new_v4(), user_id, "orphan"))
        .await
    {
        Err(Error::ForeignKey(_)) => {}
        other => panic!("Expected ForeignKey, got {:?}", other.map(|_| ())),
    }

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_activity_log_newest_first_and_paginated() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db).with_user().await.build().await;
    let user_id = data.users[0];

    for i in 0..5 {
        db.activity_logs
            .record(RecordActivityRequest {
                user_id,
                appointment_id: None,
                action: format!("step_{}", i),
                details: Some(json!({ "sequence": i })),
                ip_address: Some("203.0.113.7".to_string()),
                user_agent: None,
            })
            .await
            .expect("record");
    }

    let all = db
        .activity_logs
        .list_for_user(user_id, None, None)
        .await
        .expect("list");
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].action, "step_4");
    assert_eq!(all[4].action, "step_0");

    let page = db
        .activity_logs
        .list_for_user(user_id, Some(2), Some(1))
        .await
        .expect("page");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].action, "step_3");

    test_db.cleanup(&data).await;
}
