//! The single framing unit of the bridge protocol.
//!
//! One websocket text frame carries exactly one envelope:
//!
//! ```json
//! { "id": 3, "method": "call", "params": { "name": "sum", "seq": 1, "args": [1, 2] } }
//! ```
//!
//! `id` correlates a `ret` with the envelope it answers. Front ends may omit it
//! on calls they correlate by `name`/`seq` instead, so it defaults to `0`.

use crate::error::model_error::ModelError;
use crate::method::Method;

use common::ErrorLocation;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Envelope {
    /// Build an envelope, serializing `params` into its JSON form.
    #[track_caller]
    pub fn new<P: Serialize>(id: u64, method: Method, params: &P) -> Result<Self, ModelError> {
        let params = serde_json::to_value(params).map_err(|e| ModelError::Encode {
            message: format!("{method} params: {e}"),
            location: ErrorLocation::here(),
        })?;
        Ok(Self {
            id,
            method: method.as_str().to_string(),
            params,
        })
    }

    /// Parse one frame of text into an envelope.
    #[track_caller]
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        serde_json::from_str(text).map_err(|e| ModelError::MalformedEnvelope {
            message: e.to_string(),
            location: ErrorLocation::here(),
        })
    }

    #[track_caller]
    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string(self).map_err(|e| ModelError::Encode {
            message: e.to_string(),
            location: ErrorLocation::here(),
        })
    }

    /// The typed method tag; unknown tags are a protocol error.
    #[track_caller]
    pub fn method(&self) -> Result<Method, ModelError> {
        self.method.parse()
    }

    /// Decode `params` as the structure expected for `method`.
    #[track_caller]
    pub fn params_as<T: DeserializeOwned>(&self, method: Method) -> Result<T, ModelError> {
        T::deserialize(&self.params).map_err(|e| ModelError::Params {
            method: method.as_str(),
            message: e.to_string(),
            location: ErrorLocation::here(),
        })
    }
}
