//! Application-level invariant checks.
//!
//! These cover the invariants the storage engine does not enforce: check-in
//! ordering, cancellation pairing, opaque reference lists, and field shapes.
//! Each check returns `Ok(())` or a message; callers map the message to
//! [`crate::Error::InvalidInput`] before commit.

use chrono::{DateTime, Utc};

use crate::defaults::{EMAIL_MAX_LEN, TAG_NAME_MAX_LEN};
use crate::models::AppointmentStatus;

/// Validate an email address.
///
/// Deliberately shallow: exactly one `@` with non-empty local and domain
/// parts, no whitespace, bounded length. Uniqueness is the storage layer's
/// job and compares the stored value exactly (case-sensitive).
pub fn validate_email(email: &str) -> std::result::Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err(format!("Email must be {} characters or less", EMAIL_MAX_LEN));
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Email cannot contain whitespace".to_string());
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(format!("Invalid email address: {}", email));
    }
    Ok(())
}

/// Validate a tag color: `#` followed by exactly six hex digits.
pub fn validate_hex_color(color: &str) -> std::result::Result<(), String> {
    let rest = match color.strip_prefix('#') {
        Some(rest) => rest,
        None => return Err(format!("Color must start with '#': {}", color)),
    };
    if rest.len() != 6 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Color must be '#' plus 6 hex digits: {}", color));
    }
    Ok(())
}

/// Validate a tag name.
///
/// Rules:
/// - Length between 1-100 characters
/// - Not blank (whitespace-only)
pub fn validate_tag_name(name: &str) -> std::result::Result<(), String> {
    if name.trim().is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if name.len() > TAG_NAME_MAX_LEN {
        return Err(format!(
            "Tag name must be {} characters or less",
            TAG_NAME_MAX_LEN
        ));
    }
    Ok(())
}

/// Validate geographic coordinates.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> std::result::Result<(), String> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("Latitude out of range [-90, 90]: {}", latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("Longitude out of range [-180, 180]: {}", longitude));
    }
    Ok(())
}

/// Validate an appointment duration in minutes.
pub fn validate_duration(minutes: i32) -> std::result::Result<(), String> {
    if minutes <= 0 {
        return Err(format!("Duration must be positive minutes: {}", minutes));
    }
    Ok(())
}

/// Validate check-in/check-out ordering: check-out, when both are present,
/// must not precede check-in.
pub fn validate_check_times(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> std::result::Result<(), String> {
    if let (Some(cin), Some(cout)) = (check_in, check_out) {
        if cout < cin {
            return Err(format!(
                "Check-out time {} precedes check-in time {}",
                cout, cin
            ));
        }
    }
    Ok(())
}

/// Validate cancellation pairing: `cancelled_at` and `cancellation_reason`
/// are set together, and only when the status is `cancelled`.
pub fn validate_cancellation(
    status: AppointmentStatus,
    cancellation_reason: Option<&str>,
    cancelled_at: Option<DateTime<Utc>>,
) -> std::result::Result<(), String> {
    let cancelled = status == AppointmentStatus::Cancelled;
    match (cancellation_reason, cancelled_at) {
        (Some(reason), Some(_)) if cancelled => {
            if reason.trim().is_empty() {
                Err("Cancellation reason cannot be blank".to_string())
            } else {
                Ok(())
            }
        }
        (None, None) if !cancelled => Ok(()),
        (None, None) => Err("Cancelled appointment requires a reason and timestamp".to_string()),
        _ if !cancelled => {
            Err("Cancellation fields are only valid with status 'cancelled'".to_string())
        }
        _ => Err("cancellation_reason and cancelled_at must be set together".to_string()),
    }
}

/// Validate a note attachment URL: non-empty with an http(s) scheme.
pub fn validate_attachment_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("Attachment URL cannot be empty".to_string());
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(format!("Attachment URL must be http(s): {}", url));
    }
    Ok(())
}
