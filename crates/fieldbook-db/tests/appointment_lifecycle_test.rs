//! Integration tests for the appointment lifecycle.
//!
//! This test suite validates:
//! - Creation lands in status `scheduled` with a "created" audit row
//! - Status update to `confirmed` is read back and audited (Scenario A)
//! - Cancellation requires a reason and stamps the cancellation pair
//! - Check-out earlier than check-in is rejected before commit, and so is
//!   moving check-in past an existing check-out
//!
//! **IMPORTANT**: These tests require a fully migrated PostgreSQL database.
//! Run migrations first: `sqlx migrate run`

use chrono::{Duration, Utc};

use fieldbook_db::test_fixtures::{TestDataBuilder, TestDatabase};
use fieldbook_db::{
    ActivityLogRepository, AppointmentRepository, AppointmentStatus, Error, StatusChangeContext,
};

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_create_then_confirm_is_audited() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Quarterly review")
        .await
        .build()
        .await;
    let appointment_id = data.appointments[0];

    let created = db.appointments.fetch(appointment_id).await.expect("fetch");
    assert_eq!(created.status, AppointmentStatus::Scheduled);
    assert_eq!(created.duration_minutes, 60);

    db.appointments
        .update_status(
            appointment_id,
            AppointmentStatus::Confirmed,
            StatusChangeContext::default(),
        )
        .await
        .expect("status update");

    let confirmed = db.appointments.fetch(appointment_id).await.expect("fetch");
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let logs = db
        .activity_logs
        .list_for_appointment(appointment_id)
        .await
        .expect("logs");
    let actions: Vec<&str> = logs.iter().map(|l| l.action.as_str()).collect();
    assert!(actions.contains(&"created"));
    assert!(actions.contains(&"status_changed"));

    // Newest first; the status change carries before/after details.
    let change = logs
        .iter()
        .find(|l| l.action == "status_changed")
        .expect("status_changed row");
    let details = change.details.as_ref().expect("details payload");
    assert_eq!(details["before"], "scheduled");
    assert_eq!(details["after"], "confirmed");

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_cancellation_requires_reason() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Doomed visit")
        .await
        .build()
        .await;
    let appointment_id = data.appointments[0];

    let bare = db
        .appointments
        .update_status(
            appointment_id,
            AppointmentStatus::Cancelled,
            StatusChangeContext::default(),
        )
        .await;
    match bare {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("Expected InvalidInput, got {:?}", other),
    }

    db.appointments
        .update_status(
            appointment_id,
            AppointmentStatus::Cancelled,
            StatusChangeContext {
                cancellation_reason: Some("customer closed early".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("cancel with reason");

    let cancelled = db.appointments.fetch(appointment_id).await.expect("fetch");
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("customer closed early")
    );
    assert!(cancelled.cancelled_at.is_some());

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_check_out_before_check_in_rejected() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Site visit")
        .await
        .build()
        .await;
    let appointment_id = data.appointments[0];

    let arrival = Utc::now();
    db.appointments
        .check_in(appointment_id, arrival)
        .await
        .expect("check in");

    let too_early = db
        .appointments
        .check_out(appointment_id, arrival - Duration::minutes(10))
        .await;
    match too_early {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("Expected InvalidInput, got {:?}", other),
    }

    db.appointments
        .check_out(appointment_id, arrival + Duration::minutes(45))
        .await
        .expect("check out");

    let visited = db.appointments.fetch(appointment_id).await.expect("fetch");
    assert!(visited.check_out_time.unwrap() >= visited.check_in_time.unwrap());

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_check_in_after_check_out_rejected() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Corrected visit")
        .await
        .build()
        .await;
    let appointment_id = data.appointments[0];

    let arrival = Utc::now();
    db.appointments
        .check_in(appointment_id, arrival)
        .await
        .expect("check in");
    db.appointments
        .check_out(appointment_id, arrival + Duration::minutes(30))
        .await
        .expect("check out");

    // Correcting the arrival time must not be allowed to pass the departure.
    let too_late = db
        .appointments
        .check_in(appointment_id, arrival + Duration::minutes(45))
        .await;
    match too_late {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("Expected InvalidInput, got {:?}", other),
    }

    db.appointments
        .check_in(appointment_id, arrival + Duration::minutes(5))
        .await
        .expect("corrected check in");

    let visited = db.appointments.fetch(appointment_id).await.expect("fetch");
    assert!(visited.check_out_time.unwrap() >= visited.check_in_time.unwrap());

    test_db.cleanup(&data).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_uncancelling_clears_the_pair() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let data = TestDataBuilder::new(db)
        .with_user()
        .await
        .with_organisation()
        .await
        .with_appointment("Second chance")
        .await
        .build()
        .await;
    let appointment_id = data.appointments[0];

    db.appointments
        .update_status(
            appointment_id,
            AppointmentStatus::Cancelled,
            StatusChangeContext {
                cancellation_reason: Some("double booked".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("cancel");

    db.appointments
        .update_status(
            appointment_id,
            AppointmentStatus::Scheduled,
            StatusChangeContext::default(),
        )
        .await
        .expect("revive");

    let revived = db.appointments.fetch(appointment_id).await.expect("fetch");
    assert_eq!(revived.status, AppointmentStatus::Scheduled);
    assert!(revived.cancellation_reason.is_none());
    assert!(revived.cancelled_at.is_none());

    test_db.cleanup(&data).await;
}
