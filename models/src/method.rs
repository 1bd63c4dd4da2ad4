use crate::error::model_error::ModelError;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::str::FromStr;

/// Method tag carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Call,
    Ret,
    CallbackInvoke,
    CallbackClose,
    RefCancel,
    BindAnnounce,
    Ready,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Call,
        Method::Ret,
        Method::CallbackInvoke,
        Method::CallbackClose,
        Method::RefCancel,
        Method::BindAnnounce,
        Method::Ready,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Call => "call",
            Method::Ret => "ret",
            Method::CallbackInvoke => "callback-invoke",
            Method::CallbackClose => "callback-close",
            Method::RefCancel => "ref-cancel",
            Method::BindAnnounce => "bind-announce",
            Method::Ready => "ready",
        }
    }
}

impl FromStr for Method {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == value)
            .ok_or_else(|| ModelError::UnknownMethod {
                method: value.to_string(),
                location: ErrorLocation::here(),
            })
    }
}

impl Display for Method {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}
