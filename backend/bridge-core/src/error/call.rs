//! Call errors: everything that can go wrong with a single invocation.
//!
//! A call error never tears down a session. On the serving side it becomes the
//! `error` string of a `ret` envelope (see [`CallError::wire_message`]); on the
//! calling side it is what the awaiting caller receives.

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

pub const ARGUMENT_COUNT_MISMATCH: &str = "argument count mismatch";

#[derive(Debug, ThisError)]
pub enum CallError {
    #[error("Argument Count Error: {message} {location}")]
    ArgumentCount {
        message: String,
        location: ErrorLocation,
    },

    #[error("Argument Error: {message} {location}")]
    Argument {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handler Error: {message} {location}")]
    Handler {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Callback Error: {message} {location}")]
    UnknownCallback {
        message: String,
        location: ErrorLocation,
    },

    #[error("Callback Closed Error: {message} {location}")]
    CallbackClosed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Remote Error: {message} {location}")]
    Remote {
        message: String,
        location: ErrorLocation,
    },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connection Closed Error: {message} {location}")]
    ConnectionClosed {
        message: String,
        location: ErrorLocation,
    },
}

impl CallError {
    #[track_caller]
    pub fn argument_count(expected: usize, actual: usize) -> Self {
        log::debug!("argument count mismatch: expected {expected}, got {actual}");
        CallError::ArgumentCount {
            message: ARGUMENT_COUNT_MISMATCH.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn argument(position: usize, message: impl std::fmt::Display) -> Self {
        CallError::Argument {
            message: format!("argument {position}: {message}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn handler(message: impl Into<String>) -> Self {
        CallError::Handler {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unknown_callback(name: &str, seq: i64) -> Self {
        CallError::UnknownCallback {
            message: format!("no callback registered as {name}#{seq}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn callback_closed(name: &str, seq: i64) -> Self {
        CallError::CallbackClosed {
            message: format!("callback {name}#{seq} is closed"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn remote(message: impl Into<String>) -> Self {
        CallError::Remote {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn encode(message: impl std::fmt::Display) -> Self {
        CallError::Encode {
            message: message.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn send(message: impl std::fmt::Display) -> Self {
        CallError::Send {
            message: message.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn connection_closed() -> Self {
        CallError::ConnectionClosed {
            message: "connection closed".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// The text sent in the `error` field of a `ret` envelope.
    ///
    /// Locations stay on this side of the wire; the remote only sees the message.
    pub fn wire_message(&self) -> &str {
        match self {
            CallError::ArgumentCount { message, .. }
            | CallError::Argument { message, .. }
            | CallError::Handler { message, .. }
            | CallError::UnknownCallback { message, .. }
            | CallError::CallbackClosed { message, .. }
            | CallError::Remote { message, .. }
            | CallError::Encode { message, .. }
            | CallError::Send { message, .. }
            | CallError::ConnectionClosed { message, .. } => message,
        }
    }
}
