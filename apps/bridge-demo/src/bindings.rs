//! Bindings the demo page plays with.
//!
//! - `counter.*`: an aggregate with shared state
//! - `math.*`: a prefixed map, one fallible entry
//! - `countdown`: a token plus a callback argument
//! - `session.*`: deferred, built from the connecting page's query

use bridge_core::binding::{Aggregate, BindingSource, Members};
use bridge_core::dispatch::{Binding, CallToken, Callback};
use bridge_core::error::BindingError;
use bridge_core::ipc::{BridgeServer, SessionContext};

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use log::debug;
use serde_json::json;

/// Pause between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicI64,
}

impl Counter {
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn increment(&self, by: i64) -> i64 {
        self.value.fetch_add(by, Ordering::SeqCst) + by
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::SeqCst);
    }
}

impl Aggregate for Counter {
    fn export(self: Arc<Self>, members: &mut Members) {
        let increment = Arc::clone(&self);
        let reset = Arc::clone(&self);
        let value = Arc::clone(&self);
        members
            .method("Increment", move |by: i64| {
                let counter = Arc::clone(&increment);
                async move { counter.increment(by) }
            })
            .method("Reset", move || {
                let counter = Arc::clone(&reset);
                async move { counter.reset() }
            })
            .field("Value", move || value.value());
    }
}

pub fn math() -> Result<BindingSource, BindingError> {
    BindingSource::from_map([
        ("add", Binding::new(|a: f64, b: f64| async move { a + b })?),
        (
            "divide",
            Binding::new(|a: f64, b: f64| async move {
                if b == 0.0 {
                    Err("division by zero")
                } else {
                    Ok(a / b)
                }
            })?,
        ),
    ])?
    .with_prefix("math")
}

/// Calls `tick` with `from`, `from - 1`, ..., `1`, then returns how many ticks
/// were delivered. Stops early once `token` is cancelled.
pub async fn countdown(
    token: CallToken,
    from: i64,
    tick: Callback,
    interval: Duration,
) -> Result<i64, String> {
    let mut delivered = 0;
    for remaining in (1..=from).rev() {
        if token.is_cancelled() {
            break;
        }
        tick.call(vec![json!(remaining)])
            .await
            .map_err(|e| e.wire_message().to_string())?;
        delivered += 1;
        tokio::select! {
            _ = token.cancelled() => {
                debug!("countdown cancelled at {remaining}");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
    Ok(delivered)
}

/// Per-session bindings: the session id and the page's `user` parameter.
pub fn session() -> Result<BindingSource, BindingError> {
    BindingSource::deferred(["session.id", "session.user"], |context: &SessionContext| {
        let id = context.session_id().to_string();
        let user = context
            .query_param("user")
            .unwrap_or_else(|| "anonymous".to_string());
        BindingSource::from_map([
            (
                "id",
                Binding::new(move || {
                    let id = id.clone();
                    async move { id }
                })?,
            ),
            (
                "user",
                Binding::new(move || {
                    let user = user.clone();
                    async move { user }
                })?,
            ),
        ])?
        .with_prefix("session")
    })
}

/// Registers every demo binding on `server`.
pub fn register(server: &BridgeServer, counter: Arc<Counter>) -> Result<(), BindingError> {
    server.bind_prefixed("counter", BindingSource::from_aggregate(counter)?)?;
    server.bind(math()?);
    server.bind_function("countdown", |token: CallToken, from: i64, tick: Callback| {
        countdown(token, from, tick, TICK_INTERVAL)
    })?;
    server.bind(session()?);
    Ok(())
}
