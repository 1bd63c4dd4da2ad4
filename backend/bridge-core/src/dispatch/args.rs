use crate::dispatch::callback::Callback;
use crate::dispatch::handler::Binding;
use crate::dispatch::token::CallToken;
use crate::error::CallError;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// How the raw payload at one parameter position is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Plain JSON decoded into the parameter type.
    Value,
    /// `{seq}`: a cancellation token scoped to the invocation.
    Token,
    /// `{bindingName, seq}`: a handle to a function living on the remote side.
    Callback,
}

/// Parameter kinds and result count of a binding, fixed when it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ArgKind>,
    results: usize,
}

impl Signature {
    pub fn new(params: Vec<ArgKind>, results: usize) -> Self {
        Self { params, results }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[ArgKind] {
        &self.params
    }

    pub fn results(&self) -> usize {
        self.results
    }
}

/// One reconstructed argument, ready to be handed to a handler.
#[derive(Debug)]
pub enum Arg {
    Value(Value),
    Token(CallToken),
    Callback(Callback),
}

/// Conversion from a reconstructed [`Arg`] into a handler parameter.
///
/// Every `DeserializeOwned` type is a plain value parameter. [`CallToken`] and
/// [`Callback`] declare the special kinds so the dispatcher can build them.
pub trait FromArg: Sized + Send + 'static {
    const KIND: ArgKind = ArgKind::Value;

    fn from_arg(position: usize, arg: Arg) -> Result<Self, CallError>;
}

impl<T> FromArg for T
where
    T: DeserializeOwned + Send + 'static,
{
    fn from_arg(position: usize, arg: Arg) -> Result<Self, CallError> {
        match arg {
            Arg::Value(value) => {
                serde_json::from_value(value).map_err(|e| CallError::argument(position, e))
            }
            Arg::Token(_) | Arg::Callback(_) => {
                Err(CallError::argument(position, "expected a plain value"))
            }
        }
    }
}

/// Argument of an outbound call issued by this side.
pub enum OutboundArg {
    Value(Value),
    /// A local function the remote may invoke until it sends `callback-close`.
    Callback(Binding),
}

impl From<Value> for OutboundArg {
    fn from(value: Value) -> Self {
        OutboundArg::Value(value)
    }
}

impl From<Binding> for OutboundArg {
    fn from(binding: Binding) -> Self {
        OutboundArg::Callback(binding)
    }
}
