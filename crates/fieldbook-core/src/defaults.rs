//! Centralized default constants for the fieldbook system.
//!
//! **This module is the single source of truth** for all shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// APPOINTMENTS
// =============================================================================

/// Default appointment duration in minutes.
pub const APPOINTMENT_DURATION_MINUTES: i32 = 60;

// =============================================================================
// TAGS
// =============================================================================

/// Default tag color (hex, blue-500).
pub const TAG_COLOR: &str = "#3B82F6";

/// Maximum tag name length in characters.
pub const TAG_NAME_MAX_LEN: usize = 100;

// =============================================================================
// VALIDATION
// =============================================================================

/// Maximum stored email length (RFC 5321 path limit).
pub const EMAIL_MAX_LEN: usize = 254;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for standard list operations.
pub const PAGE_LIMIT: i64 = 50;

/// Default page size for activity log listings.
pub const PAGE_LIMIT_ACTIVITY: i64 = 100;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;
