//! Per-method params and the payloads of the two special argument kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Params of `call` and `callback-invoke`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
    pub name: String,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Params of `ret`.
///
/// `name` and `seq` echo the call being answered so a front end that did not
/// send an envelope id can still find its promise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl RetParams {
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn answering(mut self, name: &str, seq: i64) -> Self {
        self.name = Some(name.to_string());
        self.seq = Some(seq);
        self
    }

    /// The error string, treating an empty string like no error.
    pub fn failure(&self) -> Option<&str> {
        self.error.as_deref().filter(|error| !error.is_empty())
    }
}

/// Params of `callback-close`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackCloseParams {
    pub name: String,
    pub seq: i64,
}

/// Params of `ref-cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCancelParams {
    pub seq: i64,
}

/// Params of `bind-announce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindAnnounceParams {
    pub name: Vec<String>,
}

/// Params of `ready`, always `{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadyParams {}

/// Raw argument standing for a cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub seq: i64,
}

/// Raw argument standing for a callback handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub binding_name: String,
    pub seq: i64,
}
