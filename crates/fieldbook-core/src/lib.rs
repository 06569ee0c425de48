//! # fieldbook-core
//!
//! Core types, traits, and abstractions for the fieldbook data layer.
//!
//! This crate provides the domain entities of the field-appointment
//! scheduling model, the closed enumerations they use, the repository trait
//! definitions implemented by `fieldbook-db`, the application-level
//! invariant validation, and the shared error taxonomy.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use validation::{
    validate_attachment_url, validate_cancellation, validate_check_times, validate_coordinates,
    validate_duration, validate_email, validate_hex_color, validate_tag_name,
};
