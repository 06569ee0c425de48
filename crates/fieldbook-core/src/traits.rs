//! Repository traits for the fieldbook data layer.
//!
//! These traits define the query/mutation surface an application or API
//! layer builds upon, enabling pluggable backends and testability. The
//! implementations guarantee the relational contracts: cascade-on-delete
//! from users, atomic uniqueness enforcement, closed enumerations, and
//! audit rows written in the same transaction as the change they describe.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Request for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    /// Already-hashed credential. This layer never sees plaintext.
    pub password_hash: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Request for updating a user's profile. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: Option<bool>,
}

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Rejects a duplicate email with `Error::Duplicate`.
    async fn insert(&self, req: CreateUserRequest) -> Result<Uuid>;

    /// Fetch a user by ID.
    async fn fetch(&self, id: Uuid) -> Result<User>;

    /// Look up a user by exact stored email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update profile fields.
    async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<()>;

    /// Activate or deactivate an account.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<()>;

    /// Check if a user exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Delete a user and, transitively, every owned row: appointments,
    /// notes, routes, tags, activity logs, and join rows. One logical
    /// operation; no orphans remain.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// ORGANISATION REPOSITORY
// =============================================================================

/// Request for importing an organisation from the places provider.
#[derive(Debug, Clone)]
pub struct CreateOrganisationRequest {
    pub place_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub organisation_type: OrganisationType,
    pub description: Option<String>,
    pub business_status: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub photo_reference: Option<String>,
    pub opening_hours: Option<OpeningHours>,
}

/// Request for updating organisation fields. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganisationRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub organisation_type: Option<OrganisationType>,
    pub business_status: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub opening_hours: Option<OpeningHours>,
}

/// Request for listing organisations.
#[derive(Debug, Clone, Default)]
pub struct ListOrganisationsRequest {
    /// Case-insensitive substring match on the name.
    pub name_contains: Option<String>,
    /// Filter by organisation type.
    pub organisation_type: Option<OrganisationType>,
    /// Filter by active flag.
    pub is_active: Option<bool>,
    /// Bounding box: (min_lat, min_lng, max_lat, max_lng).
    pub bounds: Option<(f64, f64, f64, f64)>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Pagination offset.
    pub offset: Option<i64>,
}

/// Repository for the shared organisation catalog.
#[async_trait]
pub trait OrganisationRepository: Send + Sync {
    /// Insert an organisation. Rejects out-of-range coordinates and a
    /// duplicate `place_id` (prevents importing the same real-world place
    /// twice).
    async fn insert(&self, req: CreateOrganisationRequest) -> Result<Uuid>;

    /// Fetch an organisation by ID.
    async fn fetch(&self, id: Uuid) -> Result<Organisation>;

    /// Look up an organisation by provider place identifier.
    async fn find_by_place_id(&self, place_id: &str) -> Result<Option<Organisation>>;

    /// List organisations with filtering and pagination, ordered by name.
    async fn list(&self, req: ListOrganisationsRequest) -> Result<Vec<Organisation>>;

    /// Update organisation fields.
    async fn update(&self, id: Uuid, req: UpdateOrganisationRequest) -> Result<()>;

    /// Activate or deactivate the organisation.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<()>;

    /// Delete an organisation and, by cascade, its appointments.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// APPOINTMENT REPOSITORY
// =============================================================================

/// Request for creating a new appointment.
#[derive(Debug, Clone)]
pub struct CreateAppointmentRequest {
    pub user_id: Uuid,
    pub organisation_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    /// Defaults to [`crate::defaults::APPOINTMENT_DURATION_MINUTES`].
    pub duration_minutes: Option<i32>,
    pub priority: AppointmentPriority,
}

/// Request for updating appointment fields. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateAppointmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub priority: Option<AppointmentPriority>,
    pub reminder_sent: Option<bool>,
}

/// Request for listing appointments.
#[derive(Debug, Clone, Default)]
pub struct ListAppointmentsRequest {
    /// Filter by owning user.
    pub user_id: Option<Uuid>,
    /// Filter by organisation.
    pub organisation_id: Option<Uuid>,
    /// Filter by status.
    pub status: Option<AppointmentStatus>,
    /// Filter: scheduled on or after this date.
    pub date_from: Option<NaiveDate>,
    /// Filter: scheduled on or before this date.
    pub date_to: Option<NaiveDate>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Pagination offset.
    pub offset: Option<i64>,
}

/// Audit context carried with a status change.
#[derive(Debug, Clone, Default)]
pub struct StatusChangeContext {
    /// Required when the new status is `cancelled`.
    pub cancellation_reason: Option<String>,
    /// Request metadata for the audit row.
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Repository for appointments.
///
/// Every mutation that touches more than one row (status change + audit,
/// reschedule) runs in a single transaction so partial writes are never
/// observable.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Insert a new appointment in status `scheduled`, writing a "created"
    /// activity log row in the same transaction.
    async fn insert(&self, req: CreateAppointmentRequest) -> Result<Uuid>;

    /// Fetch an appointment by ID.
    async fn fetch(&self, id: Uuid) -> Result<Appointment>;

    /// List appointments, ordered by scheduled date then time.
    async fn list(&self, req: ListAppointmentsRequest) -> Result<Vec<Appointment>>;

    /// Update schedulable fields.
    async fn update(&self, id: Uuid, req: UpdateAppointmentRequest) -> Result<()>;

    /// Set a new status, writing a "status_changed" activity log row with
    /// before/after details in the same transaction. Transitioning to
    /// `cancelled` requires a reason in the context and stamps
    /// `cancelled_at`; transitioning away clears both cancellation fields.
    async fn update_status(
        &self,
        id: Uuid,
        new_status: AppointmentStatus,
        ctx: StatusChangeContext,
    ) -> Result<()>;

    /// Replace an appointment: inserts the replacement with
    /// `rescheduled_from` pointing at the old one, marks the old appointment
    /// `rescheduled`, and logs both rows, all in one transaction. Returns
    /// the new appointment's ID.
    async fn reschedule(&self, old_id: Uuid, req: CreateAppointmentRequest) -> Result<Uuid>;

    /// Record the field agent's arrival.
    async fn check_in(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Record the field agent's departure. Rejects a departure earlier than
    /// the recorded arrival.
    async fn check_out(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Check if an appointment exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Delete an appointment and, by cascade, its notes, tag links, and
    /// appointment-scoped activity logs.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Request for creating a note on an appointment.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub appointment_id: Uuid,
    pub user_id: Uuid,
    pub note_type: NoteType,
    pub content: String,
    /// Ordered attachment URLs; validated at this boundary, stored opaquely.
    pub attachments: Vec<String>,
    pub is_important: bool,
}

/// Request for updating a note. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteRequest {
    pub note_type: Option<NoteType>,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub is_important: Option<bool>,
}

/// Repository for appointment notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note. Attachment URLs are validated here; the storage layer
    /// treats them as opaque strings.
    async fn insert(&self, req: CreateNoteRequest) -> Result<Uuid>;

    /// Fetch a note by ID.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// List all notes for an appointment, oldest first.
    async fn list_for_appointment(&self, appointment_id: Uuid) -> Result<Vec<Note>>;

    /// List a user's notes, newest first, with pagination.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Note>>;

    /// Update note fields.
    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<()>;

    /// Delete a note.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// ROUTE REPOSITORY
// =============================================================================

/// Request for storing a day's route.
#[derive(Debug, Clone)]
pub struct CreateRouteRequest {
    pub user_id: Uuid,
    pub route_date: NaiveDate,
    /// Ordered appointment IDs as computed by the external provider. Every
    /// ID must reference an existing appointment of the same user.
    pub appointment_ids: Vec<Uuid>,
    pub route_metadata: Option<RouteMetadata>,
}

/// Request for updating a route. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateRouteRequest {
    pub route_date: Option<NaiveDate>,
    pub appointment_ids: Option<Vec<Uuid>>,
    pub route_metadata: Option<RouteMetadata>,
}

/// Repository for per-day visit routes.
#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Insert a route. Membership of `appointment_ids` is validated here
    /// (every ID exists and belongs to the route's user); the storage layer
    /// keeps the list opaque and order-preserving.
    async fn insert(&self, req: CreateRouteRequest) -> Result<Uuid>;

    /// Fetch a route by ID.
    async fn fetch(&self, id: Uuid) -> Result<Route>;

    /// Find a user's routes for one day. Returns a Vec: one route per day
    /// is the convention, but multiples are permitted.
    async fn find_for_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Route>>;

    /// List a user's routes, most recent date first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Route>>;

    /// Update a route, re-validating membership when the list changes.
    async fn update(&self, id: Uuid, req: UpdateRouteRequest) -> Result<()>;

    /// Delete a route.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Request for creating a tag.
#[derive(Debug, Clone)]
pub struct CreateTagRequest {
    pub user_id: Uuid,
    pub name: String,
    /// Hex color; defaults to [`crate::defaults::TAG_COLOR`] when `None`.
    pub color: Option<String>,
}

/// Request for updating a tag. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Repository for user-scoped tags and their appointment links.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a tag. Rejects a duplicate `(user_id, name)` with
    /// `Error::Duplicate`; the same name under another user is fine.
    async fn create(&self, req: CreateTagRequest) -> Result<Uuid>;

    /// Fetch a tag by ID.
    async fn fetch(&self, id: Uuid) -> Result<Tag>;

    /// List a user's tags with appointment usage counts, ordered by name.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<TagWithCount>>;

    /// Rename or recolor a tag. Renaming into an existing name is rejected.
    async fn update(&self, id: Uuid, req: UpdateTagRequest) -> Result<()>;

    /// Delete a tag and, by cascade, its appointment links.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Attach a tag to an appointment. Idempotent: attaching an already
    /// attached pair is a no-op, never a duplicate row.
    async fn add_to_appointment(&self, appointment_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Detach a tag from an appointment.
    async fn remove_from_appointment(&self, appointment_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Get all tags attached to an appointment, ordered by name.
    async fn get_for_appointment(&self, appointment_id: Uuid) -> Result<Vec<Tag>>;

    /// Replace an appointment's tag set in one transaction.
    async fn set_for_appointment(&self, appointment_id: Uuid, tag_ids: Vec<Uuid>) -> Result<()>;
}

// =============================================================================
// ACTIVITY LOG REPOSITORY
// =============================================================================

/// Request for recording an audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActivityRequest {
    pub user_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub action: String,
    pub details: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Repository for the append-only audit trail.
///
/// Deliberately write-once: there is no update or delete operation. Rows
/// disappear only through the owning user's cascade.
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Append an audit row.
    async fn record(&self, req: RecordActivityRequest) -> Result<Uuid>;

    /// List a user's audit rows, newest first, with pagination.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ActivityLog>>;

    /// List audit rows scoped to an appointment, newest first.
    async fn list_for_appointment(&self, appointment_id: Uuid) -> Result<Vec<ActivityLog>>;
}
