use bridge_core::error::{BindingError, ConfigError, IpcError};

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors that end the demo binary.
///
/// Core errors are flattened into messages here; their own location is part of
/// the message, the variant's location is where the demo saw them.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Error from this App
    #[error("Demo Error: {message} {location}")]
    Demo {
        message: String,
        location: ErrorLocation,
    },

    /// Config could not be loaded or saved
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// A demo binding was rejected
    #[error("Binding Error: {message} {location}")]
    Binding {
        message: String,
        location: ErrorLocation,
    },

    /// The server failed to start or run
    #[error("Server Error: {message} {location}")]
    Server {
        message: String,
        location: ErrorLocation,
    },
}

impl DemoError {
    #[track_caller]
    pub fn demo(message: impl Into<String>) -> Self {
        DemoError::Demo {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for DemoError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        DemoError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<BindingError> for DemoError {
    #[track_caller]
    fn from(error: BindingError) -> Self {
        DemoError::Binding {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IpcError> for DemoError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        DemoError::Server {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
