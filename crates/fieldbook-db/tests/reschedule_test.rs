//! Integration tests for appointment rescheduling.
//!
//! This test suite validates:
//! - Rescheduling inserts the replacement with `rescheduled_from` pointing
//!   at the old appointment, marks the old one `rescheduled`, and both rows
//!   coexist (Scenario B)
//! - Both sides of the operation are audited in the same transaction
//! - Rescheduling a cancelled appointment clears the cancellation pair
//! - Rescheduling a missing appointment fails without inserting anything
//!
//! **IMPORTANT**: These tests require a fully migrated PostgreSQL database.
//! Run migrations first: `sqlx migrate run`

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use fieldbook_db::test_fixtures::{appointment_request, TestDataBuilder, TestDatabase};
use fieldbook_db::{
    ActivityLogRepository, AppointmentRepository, AppointmentStatus, CreateAppointmentRequest,
    Error, ListAppointmentsRequest, StatusChangeContext,
};

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_reschedule_links_old_and_new() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Original slot")
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let organisation_id = data.organisations[0];
    let old_id = data.appointments[0];

    let mut replacement = appointment_request(user_id, organisation_id, "Moved slot");
    replacement.scheduled_date = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
    replacement.scheduled_time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();

    let new_id = db
        .appointments
        .reschedule(old_id, replacement)
        .await
        .expect("reschedule");

    let old = db.appointments.fetch(old_id).await.expect("fetch old");
    let new = db.appointments.fetch(new_id).await.expect("fetch new");

    assert_eq!(old.status, AppointmentStatus::Rescheduled);
    assert_eq!(new.status, AppointmentStatus::Scheduled);
    assert_eq!(new.rescheduled_from, Some(old_id));

    // The back-reference resolves to the replaced appointment.
    let prior = db
        .appointments
        .fetch(new.rescheduled_from.unwrap())
        .await
        .expect("resolve rescheduled_from");
    assert_eq!(prior.id, old_id);
    assert_eq!(prior.title, "Original slot");

    // Old row audited as replaced, new row audited as created.
    let old_logs = db
        .activity_logs
        .list_for_appointment(old_id)
        .await
        .expect("old logs");
    let change = old_logs
        .iter()
        .find(|l| l.action == "status_changed")
        .expect("status_changed row");
    let details = change.details.as_ref().expect("details");
    assert_eq!(details["after"], "rescheduled");
    assert_eq!(details["replaced_by"], new_id.to_string());

    let new_logs = db
        .activity_logs
        .list_for_appointment(new_id)
        .await
        .expect("new logs");
    assert!(new_logs.iter().any(|l| l.action == "created"));

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_reschedule_cancelled_appointment_clears_cancellation() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Cancelled slot")
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let organisation_id = data.organisations[0];
    let old_id = data.appointments[0];

    db.appointments
        .update_status(
            old_id,
            AppointmentStatus::Cancelled,
            StatusChangeContext {
                cancellation_reason: Some("customer away".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("cancel");

    let new_id = db
        .appointments
        .reschedule(
            old_id,
            appointment_request(user_id, organisation_id, "Recovered slot"),
        )
        .await
        .expect("reschedule");

    // The old row is rescheduled, not cancelled; the pair goes with the status.
    let old = db.appointments.fetch(old_id).await.expect("fetch old");
    assert_eq!(old.status, AppointmentStatus::Rescheduled);
    assert!(old.cancellation_reason.is_none());
    assert!(old.cancelled_at.is_none());

    let new = db.appointments.fetch(new_id).await.expect("fetch new");
    assert_eq!(new.rescheduled_from, Some(old_id));

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_reschedule_missing_appointment_inserts_nothing() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .build()
        .await;
    let user_id = data.users[0];
    let organisation_id = data.organisations[0];

    let missing = Uuid::new_v4();
    let req: CreateAppointmentRequest =
        appointment_request(user_id, organisation_id, "Orphan slot");

    match db.appointments.reschedule(missing, req).await {
        Err(Error::AppointmentNotFound(id)) => assert_eq!(id, missing),
        other => panic!("Expected AppointmentNotFound, got {:?}", other),
    }

    // The failed transaction left no replacement behind.
    let listed = db
        .appointments
        .list(ListAppointmentsRequest {
            user_id: Some(user_id),
            ..Default::default()
        })
        .await
        .expect("list");
    assert!(listed.is_empty());

    test_db.cleanup(&data).await;
}
