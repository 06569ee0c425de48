//! Mapping of PostgreSQL constraint violations onto the error taxonomy.
//!
//! Uniqueness and referential violations surface from the engine as
//! `sqlx::Error::Database`; repositories use these helpers to turn them into
//! `Error::Duplicate` / `Error::ForeignKey` so the losing writer gets an
//! identifiable rejection instead of an opaque database error.

use sqlx::error::ErrorKind;

/// Name of the violated constraint, when the engine reports one.
pub(crate) fn constraint_name(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_string),
        _ => None,
    }
}

/// True when the error is a unique constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation)
}

/// True when the error is a foreign key violation (SQLSTATE 23503).
pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::ForeignKeyViolation)
}

/// True when the error is a CHECK constraint violation (SQLSTATE 23514),
/// e.g. an out-of-set enumeration token or out-of-range coordinate that
/// slipped past application validation.
pub(crate) fn is_check_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::CheckViolation)
}
