//! Per-connection bookkeeping shared by the read loop and outbound calls.
//!
//! All tables use short, synchronous critical sections; no lock is held across
//! an `.await`.

use crate::dispatch::{Binding, CallOutcome};
use crate::error::CallError;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outbound calls waiting for their `ret`, keyed by envelope id.
#[derive(Default)]
pub(crate) struct PendingCalls {
    inner: Mutex<PendingInner>,
}

#[derive(Default)]
struct PendingInner {
    waiters: HashMap<u64, oneshot::Sender<CallOutcome>>,
    abandoned: bool,
}

impl PendingCalls {
    /// Registers a waiter for `id`. Fails once the connection has gone away.
    pub(crate) fn register(&self, id: u64) -> Result<PendingCall<'_>, CallError> {
        let mut inner = lock(&self.inner);
        if inner.abandoned {
            return Err(CallError::connection_closed());
        }
        let (sender, receiver) = oneshot::channel();
        inner.waiters.insert(id, sender);
        Ok(PendingCall {
            calls: self,
            id,
            receiver,
        })
    }

    /// Hands `outcome` to the waiter for `id`. Gives it back when nobody waits.
    pub(crate) fn resolve(&self, id: u64, outcome: CallOutcome) -> Result<(), CallOutcome> {
        let waiter = lock(&self.inner).waiters.remove(&id);
        match waiter {
            Some(sender) => sender.send(outcome),
            None => Err(outcome),
        }
    }

    fn remove(&self, id: u64) {
        lock(&self.inner).waiters.remove(&id);
    }

    /// Drops every waiter and refuses new ones. Returns how many were dropped.
    pub(crate) fn abandon_all(&self) -> usize {
        let mut inner = lock(&self.inner);
        inner.abandoned = true;
        let count = inner.waiters.len();
        inner.waiters.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).waiters.len()
    }
}

/// A registered waiter. Dropping it before the reply arrived forgets the entry,
/// so callers that give up (timeout, select) leave nothing behind.
pub(crate) struct PendingCall<'a> {
    calls: &'a PendingCalls,
    id: u64,
    receiver: oneshot::Receiver<CallOutcome>,
}

impl PendingCall<'_> {
    /// Waits for the reply. An abandoned waiter fails with connection closed.
    pub(crate) async fn outcome(&mut self) -> CallOutcome {
        (&mut self.receiver)
            .await
            .unwrap_or_else(|_| Err(CallError::connection_closed()))
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        self.calls.remove(self.id);
    }
}

pub(crate) type CancelAction = Box<dyn FnOnce() + Send>;

/// Cancellation actions of tokens received from the remote, keyed by the
/// remote's sequence number.
#[derive(Default)]
pub(crate) struct RefTable {
    actions: Mutex<HashMap<i64, CancelAction>>,
}

impl RefTable {
    pub(crate) fn register(&self, seq: i64, action: CancelAction) {
        if lock(&self.actions).insert(seq, action).is_some() {
            log::warn!("ref {seq} registered twice; keeping the newest");
        }
    }

    pub(crate) fn unregister(&self, seq: i64) -> bool {
        lock(&self.actions).remove(&seq).is_some()
    }

    /// Runs and forgets the action for `seq`. A second cancel finds nothing.
    pub(crate) fn fire(&self, seq: i64) -> bool {
        let action = lock(&self.actions).remove(&seq);
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    /// Runs every action. Returns how many ran.
    pub(crate) fn fire_all(&self) -> usize {
        let actions: Vec<CancelAction> = lock(&self.actions)
            .drain()
            .map(|(_, action)| action)
            .collect();
        let count = actions.len();
        for action in actions {
            action();
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.actions).len()
    }
}

/// Local functions handed to the remote as callback arguments, keyed by
/// `(binding name, seq)`.
#[derive(Default)]
pub(crate) struct CallbackTable {
    inner: Mutex<CallbackInner>,
}

#[derive(Default)]
struct CallbackInner {
    handlers: HashMap<(String, i64), Binding>,
    last_seq: HashMap<String, i64>,
}

impl CallbackTable {
    pub(crate) fn register(&self, name: &str, binding: Binding) -> i64 {
        let mut inner = lock(&self.inner);
        let seq = inner.last_seq.entry(name.to_string()).or_insert(0);
        *seq += 1;
        let seq = *seq;
        inner.handlers.insert((name.to_string(), seq), binding);
        seq
    }

    pub(crate) fn get(&self, name: &str, seq: i64) -> Option<Binding> {
        lock(&self.inner).handlers.get(&(name.to_string(), seq)).cloned()
    }

    pub(crate) fn remove(&self, name: &str, seq: i64) -> bool {
        lock(&self.inner)
            .handlers
            .remove(&(name.to_string(), seq))
            .is_some()
    }

    pub(crate) fn clear(&self) {
        lock(&self.inner).handlers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).handlers.len()
    }
}

/// Per-name sequence counters for outbound calls.
#[derive(Default)]
pub(crate) struct CallSequences {
    last: Mutex<HashMap<String, i64>>,
}

impl CallSequences {
    pub(crate) fn next(&self, name: &str) -> i64 {
        let mut last = lock(&self.last);
        let seq = last.entry(name.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }
}
