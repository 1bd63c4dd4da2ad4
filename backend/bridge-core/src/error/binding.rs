//! Construction errors raised while building binding sources.
//!
//! These never reach the wire: they are returned to whoever registers the
//! binding, or logged when a deferred source fails to materialize for a
//! session.

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum BindingError {
    #[error("Invalid Name Error: {message} {location}")]
    InvalidName {
        message: String,
        location: ErrorLocation,
    },

    #[error("Reserved Name Error: {message} {location}")]
    ReservedName {
        message: String,
        location: ErrorLocation,
    },

    #[error("Empty Names Error: {message} {location}")]
    EmptyNames {
        message: String,
        location: ErrorLocation,
    },

    #[error("Too Many Results Error: {name} declares {count} results (at most 2) {location}")]
    TooManyResults {
        name: String,
        count: usize,
        location: ErrorLocation,
    },

    #[error("Deferred Mismatch Error: {message} {location}")]
    DeferredMismatch {
        message: String,
        location: ErrorLocation,
    },

    #[error("Factory Error: {message} {location}")]
    Factory {
        message: String,
        location: ErrorLocation,
    },
}

impl BindingError {
    #[track_caller]
    pub fn invalid_name(message: impl Into<String>) -> Self {
        BindingError::InvalidName {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn reserved_name(name: &str) -> Self {
        BindingError::ReservedName {
            message: format!("binding name '{name}' is reserved for internal use"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn empty_names(message: impl Into<String>) -> Self {
        BindingError::EmptyNames {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn too_many_results(name: impl Into<String>, count: usize) -> Self {
        BindingError::TooManyResults {
            name: name.into(),
            count,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn deferred_mismatch(missing: &[String], unexpected: &[String]) -> Self {
        BindingError::DeferredMismatch {
            message: format!(
                "materialized names differ from declaration (missing: [{}], unexpected: [{}])",
                missing.join(", "),
                unexpected.join(", ")
            ),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn factory(message: impl Into<String>) -> Self {
        BindingError::Factory {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
