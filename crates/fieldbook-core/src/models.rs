//! Core data models for fieldbook.
//!
//! These types are shared across all fieldbook crates and represent the
//! persistent entities of the field-appointment scheduling domain.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// ENUMERATIONS
// =============================================================================
//
// Closed sets. Extend by adding a variant, never by renumbering. The stored
// spelling is the snake_case token; an unrecognized token on read or write is
// a data-integrity error, not a silently-accepted value.

/// Lifecycle status of an appointment.
///
/// Appointments are created in `Scheduled`; every transition is an explicit
/// status update issued by the application layer. No automatic transition
/// logic lives in this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Rescheduled => write!(f, "rescheduled"),
            Self::NoShow => write!(f, "no_show"),
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "confirmed" => Ok(Self::Confirmed),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "rescheduled" => Ok(Self::Rescheduled),
            "no_show" => Ok(Self::NoShow),
            _ => Err(format!("Invalid appointment status: {}", s)),
        }
    }
}

/// Priority of an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for AppointmentPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for AppointmentPriority {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid appointment priority: {}", s)),
        }
    }
}

/// Phase a note belongs to relative to its appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    PreAppointment,
    #[default]
    DuringAppointment,
    PostAppointment,
    FollowUp,
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreAppointment => write!(f, "pre_appointment"),
            Self::DuringAppointment => write!(f, "during_appointment"),
            Self::PostAppointment => write!(f, "post_appointment"),
            Self::FollowUp => write!(f, "follow_up"),
        }
    }
}

impl std::str::FromStr for NoteType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pre_appointment" => Ok(Self::PreAppointment),
            "during_appointment" => Ok(Self::DuringAppointment),
            "post_appointment" => Ok(Self::PostAppointment),
            "follow_up" => Ok(Self::FollowUp),
            _ => Err(format!("Invalid note type: {}", s)),
        }
    }
}

/// Category of a visit destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganisationType {
    Retail,
    Corporate,
    Government,
    Education,
    Healthcare,
    #[default]
    Other,
}

impl std::fmt::Display for OrganisationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retail => write!(f, "retail"),
            Self::Corporate => write!(f, "corporate"),
            Self::Government => write!(f, "government"),
            Self::Education => write!(f, "education"),
            Self::Healthcare => write!(f, "healthcare"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for OrganisationType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "retail" => Ok(Self::Retail),
            "corporate" => Ok(Self::Corporate),
            "government" => Ok(Self::Government),
            "education" => Ok(Self::Education),
            "healthcare" => Ok(Self::Healthcare),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid organisation type: {}", s)),
        }
    }
}

// =============================================================================
// SEMI-STRUCTURED PAYLOADS
// =============================================================================
//
// Provider-shaped payloads with no rigid sub-schema. All members optional;
// shape is validated on read, not on write.

/// Opening hours as supplied by the external places provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekday_text: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
}

/// Route totals and endpoints as supplied by the external map provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_address: Option<String>,
}

// =============================================================================
// USER
// =============================================================================

/// An account holder (mobile field agent).
///
/// Owns appointments, notes, routes, tags, and activity logs; deleting a
/// user cascades deletion of all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Password credential, always a hash, never plaintext.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

// =============================================================================
// ORGANISATION
// =============================================================================

/// A visit destination sourced from the external map/places provider.
///
/// Shared catalog entity: populated by discovery against the provider, never
/// hand-authored, and not owned by any user. Coordinates are mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisation {
    pub id: Uuid,
    /// Provider place identifier, unique system-wide when present.
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
    pub is_active: bool,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

// =============================================================================
// APPOINTMENT
// =============================================================================

/// A scheduled visit linking exactly one user to exactly one organisation.
///
/// The scheduled date and time-of-day are independent fields because external
/// systems submit and display them separately. `rescheduled_from` is an
/// informational back-reference forming a linked history of reschedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organisation_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub priority: AppointmentPriority,
    pub reminder_sent: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rescheduled_from: Option<Uuid>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

// =============================================================================
// NOTE
// =============================================================================

/// Free-text annotation attached to one appointment, authored by one user.
///
/// Attachments are opaque URL strings; referential validity is an
/// application-boundary concern, not a storage constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub user_id: Uuid,
    pub note_type: NoteType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    pub is_important: bool,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

// =============================================================================
// ROUTE
// =============================================================================

/// A user's ordered plan of appointments for one calendar day.
///
/// The order of `appointment_ids` is authoritative and externally computed;
/// this layer stores it opaquely. Membership (every id an existing
/// appointment of the same user) is validated by the repository at write
/// time, not by an engine foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub user_id: Uuid,
    pub route_date: NaiveDate,
    pub appointment_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_metadata: Option<RouteMetadata>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

// =============================================================================
// TAG
// =============================================================================

/// A user-scoped label. `(user_id, name)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Hex color string, e.g. `#3B82F6`.
    pub color: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Tag with its appointment usage count, for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub appointment_count: i64,
}

/// Many-to-many join between an appointment and a tag.
///
/// No independent identifier: the pair plus creation timestamp is the full
/// record, and the pair appears at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentTag {
    pub appointment_id: Uuid,
    pub tag_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
}

// =============================================================================
// ACTIVITY LOG
// =============================================================================

/// Immutable audit record of an action taken by a user.
///
/// Append-only: rows are written once and retained; a correction is a new
/// row. `appointment_id` is absent for actions with no appointment context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub appointment_id: Option<Uuid>,
    /// Short free-form label, e.g. "created", "status_changed".
    pub action: String,
    /// Structured before/after payload.
    pub details: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_appointment_status_display_round_trip() {
        let all = [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rescheduled,
            AppointmentStatus::NoShow,
        ];
        for status in all {
            let token = status.to_string();
            assert_eq!(AppointmentStatus::from_str(&token).unwrap(), status);
        }
    }

    #[test]
    fn test_appointment_status_snake_case_tokens() {
        assert_eq!(AppointmentStatus::InProgress.to_string(), "in_progress");
        assert_eq!(AppointmentStatus::NoShow.to_string(), "no_show");
    }

    #[test]
    fn test_appointment_status_rejects_unknown() {
        assert!(AppointmentStatus::from_str("done").is_err());
        assert!(AppointmentStatus::from_str("SCHEDULED").is_err());
        assert!(AppointmentStatus::from_str("").is_err());
    }

    #[test]
    fn test_appointment_status_default() {
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_priority_default_and_parse() {
        assert_eq!(AppointmentPriority::default(), AppointmentPriority::Medium);
        assert_eq!(
            AppointmentPriority::from_str("urgent").unwrap(),
            AppointmentPriority::Urgent
        );
        assert!(AppointmentPriority::from_str("critical").is_err());
    }

    #[test]
    fn test_note_type_default_and_parse() {
        assert_eq!(NoteType::default(), NoteType::DuringAppointment);
        assert_eq!(
            NoteType::from_str("follow_up").unwrap(),
            NoteType::FollowUp
        );
        assert!(NoteType::from_str("followup").is_err());
    }

    #[test]
    fn test_organisation_type_default_and_parse() {
        assert_eq!(OrganisationType::default(), OrganisationType::Other);
        assert_eq!(
            OrganisationType::from_str("healthcare").unwrap(),
            OrganisationType::Healthcare
        );
        assert!(OrganisationType::from_str("hospital").is_err());
    }

    #[test]
    fn test_enum_serde_spelling() {
        let json = serde_json::to_string(&AppointmentStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);

        let parsed: NoteType = serde_json::from_str(r#""pre_appointment""#).unwrap();
        assert_eq!(parsed, NoteType::PreAppointment);
    }

    #[test]
    fn test_enum_serde_rejects_unknown() {
        let result: std::result::Result<AppointmentStatus, _> =
            serde_json::from_str(r#""postponed""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_opening_hours_serde() {
        let hours = OpeningHours {
            weekday_text: vec!["Monday: 9 AM – 5 PM".to_string()],
            open_now: Some(true),
        };
        let json = serde_json::to_value(&hours).unwrap();
        let back: OpeningHours = serde_json::from_value(json).unwrap();
        assert_eq!(back, hours);
    }

    #[test]
    fn test_route_metadata_all_optional() {
        let meta: RouteMetadata = serde_json::from_str("{}").unwrap();
        assert!(meta.total_distance.is_none());
        assert!(meta.end_address.is_none());
    }

    #[test]
    fn test_user_password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "argon2id$secret".to_string(),
            name: None,
            phone: None,
            avatar_url: None,
            is_active: true,
            email_verified: false,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
    }
}
