use crate::dispatch::args::{Arg, ArgKind, FromArg};
use crate::error::CallError;

use tokio_util::sync::CancellationToken;

/// Cancellation token handed to a handler for the duration of one invocation.
///
/// It is cancelled when the remote sends `ref-cancel` for its sequence number,
/// and unconditionally once the invocation returns.
#[derive(Debug, Clone)]
pub struct CallToken {
    seq: Option<i64>,
    token: CancellationToken,
}

impl CallToken {
    pub(crate) fn new(seq: Option<i64>) -> Self {
        Self {
            seq,
            token: CancellationToken::new(),
        }
    }

    /// Remote sequence number, absent when the caller passed `null`.
    pub fn seq(&self) -> Option<i64> {
        self.seq
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl FromArg for CallToken {
    const KIND: ArgKind = ArgKind::Token;

    fn from_arg(position: usize, arg: Arg) -> Result<Self, CallError> {
        match arg {
            Arg::Token(token) => Ok(token),
            _ => Err(CallError::argument(position, "expected a cancellation token")),
        }
    }
}
