//! Marshaling and dispatch of remote calls.
//!
//! A [`Binding`] is built once per callable from a typed async handler. Its
//! [`Signature`] records, for every parameter, whether the raw payload is an
//! ordinary value, a cancellation token or a callback handle, and how many
//! results the handler produces. The dispatcher uses that descriptor to turn the
//! raw JSON arguments of an incoming `call` into typed arguments, runs the
//! handler and normalizes what it returns into a `(value, error)` pair.
//!
//! ```ignore
//! let sum = Binding::new(|a: i64, b: i64| async move { a + b })?;
//! let slow = Binding::new(|token: CallToken, n: u64| async move {
//!     tokio::select! {
//!         _ = token.cancelled() => Err("cancelled"),
//!         _ = tokio::time::sleep(Duration::from_millis(n)) => Ok(n),
//!     }
//! })?;
//! ```

mod args;
mod callback;
mod handler;
mod marshal;
mod reply;
mod token;

pub use args::{Arg, ArgKind, FromArg, OutboundArg, Signature};
pub use callback::Callback;
pub use handler::{Binding, Handler};
pub use reply::{IntoReply, Json};
pub use token::CallToken;

pub(crate) use marshal::invoke;

use crate::error::CallError;

use futures_util::future::BoxFuture;
use serde_json::Value;

/// What a dispatched call produces: the result value, or the error to report.
pub type CallOutcome = Result<Value, CallError>;

/// Future returned by a binding's dispatch thunk.
pub type CallFuture = BoxFuture<'static, CallOutcome>;
