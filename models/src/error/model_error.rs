use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("Malformed Envelope Error: {message} {location}")]
    MalformedEnvelope {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Method Error: {method} {location}")]
    UnknownMethod {
        method: String,
        location: ErrorLocation,
    },

    #[error("Params Error: {method}: {message} {location}")]
    Params {
        method: &'static str,
        message: String,
        location: ErrorLocation,
    },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },
}
