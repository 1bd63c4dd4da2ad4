//! Result normalization.
//!
//! A handler may produce nothing, a value, an error, or a value-or-error. The
//! associated `RESULTS` count mirrors that shape (0, 1, 1, 2); a nested
//! `Result` counts 3 and is refused when the binding is built.

use crate::dispatch::CallOutcome;
use crate::error::CallError;

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use serde::Serialize;
use serde_json::Value;

pub trait IntoReply: Send + 'static {
    const RESULTS: usize;

    fn into_reply(self) -> CallOutcome;
}

/// Wrapper sending any serializable value as the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

fn encode<T: Serialize>(value: T) -> CallOutcome {
    serde_json::to_value(value).map_err(CallError::encode)
}

impl IntoReply for () {
    const RESULTS: usize = 0;

    fn into_reply(self) -> CallOutcome {
        Ok(Value::Null)
    }
}

macro_rules! value_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                const RESULTS: usize = 1;

                fn into_reply(self) -> CallOutcome {
                    encode(self)
                }
            }
        )*
    };
}

value_reply!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    char,
    String,
    &'static str,
    Value,
);

impl<T: Serialize + Send + 'static> IntoReply for Json<T> {
    const RESULTS: usize = 1;

    fn into_reply(self) -> CallOutcome {
        encode(self.0)
    }
}

impl<T: Serialize + Send + 'static> IntoReply for Vec<T> {
    const RESULTS: usize = 1;

    fn into_reply(self) -> CallOutcome {
        encode(self)
    }
}

impl<T: Serialize + Send + 'static> IntoReply for Option<T> {
    const RESULTS: usize = 1;

    fn into_reply(self) -> CallOutcome {
        encode(self)
    }
}

impl<K, V> IntoReply for HashMap<K, V>
where
    K: Serialize + Eq + Hash + Send + 'static,
    V: Serialize + Send + 'static,
{
    const RESULTS: usize = 1;

    fn into_reply(self) -> CallOutcome {
        encode(self)
    }
}

impl<K, V> IntoReply for BTreeMap<K, V>
where
    K: Serialize + Ord + Send + 'static,
    V: Serialize + Send + 'static,
{
    const RESULTS: usize = 1;

    fn into_reply(self) -> CallOutcome {
        encode(self)
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Display + Send + 'static,
{
    const RESULTS: usize = T::RESULTS + 1;

    fn into_reply(self) -> CallOutcome {
        match self {
            Ok(value) => value.into_reply(),
            Err(error) => Err(CallError::handler(error.to_string())),
        }
    }
}
