// Unit tests for per-connection tables

use crate::error::CallError;
use crate::ipc::tables::{CallbackTable, PendingCalls, RefTable};
use crate::dispatch::Binding;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

/// **VALUE**: Verifies a cancel action fires at most once however many times
/// its seq is cancelled.
///
/// **BUG THIS CATCHES**: Would catch the table keeping the action after firing.
#[test]
fn given_registered_ref_when_fired_twice_then_action_runs_once() {
    let refs = RefTable::default();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    refs.register(5, Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(refs.fire(5));
    assert!(!refs.fire(5));
    assert!(!refs.unregister(5));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies waiters are matched by id and refused after abandonment.
#[tokio::test]
async fn given_pending_calls_when_resolved_and_abandoned_then_waiters_released() {
    let pending = PendingCalls::default();
    let mut first = pending.register(1).expect("open");
    let mut second = pending.register(2).expect("open");

    assert!(pending.resolve(2, Ok(json!("two"))).is_ok());
    assert!(pending.resolve(3, Ok(json!("nobody"))).is_err());
    assert_eq!(second.outcome().await.expect("ok"), json!("two"));

    assert_eq!(pending.abandon_all(), 1);
    assert!(matches!(
        first.outcome().await,
        Err(CallError::ConnectionClosed { .. })
    ));
    assert!(matches!(
        pending.register(4),
        Err(CallError::ConnectionClosed { .. })
    ));
}

/// **VALUE**: Verifies a waiter dropped before its reply leaves no entry behind.
///
/// **WHY THIS MATTERS**: Callers wrap calls in timeouts; unknown names are never
/// answered, so forgotten entries would pile up for the whole session.
///
/// **BUG THIS CATCHES**: Would catch the entry outliving the caller that gave up,
/// and a late reply then finding a stale waiter.
#[test]
fn given_waiter_when_dropped_before_reply_then_entry_removed() {
    // GIVEN: Two registered waiters
    let pending = PendingCalls::default();
    let first = pending.register(1).expect("open");
    let second = pending.register(2).expect("open");
    assert_eq!(pending.len(), 2);

    // WHEN: The first caller gives up
    drop(first);

    // THEN: Only the live waiter remains, and a late reply finds nobody
    assert_eq!(pending.len(), 1);
    assert!(pending.resolve(1, Ok(json!("late"))).is_err());
    drop(second);
    assert_eq!(pending.len(), 0);
}

/// **VALUE**: Verifies callback seqs count up per name and removal is idempotent.
#[test]
fn given_callbacks_when_registered_then_seq_per_name() {
    let table = CallbackTable::default();
    let noop = Binding::new(|| async {}).expect("valid");

    assert_eq!(table.register("each", noop.clone()), 1);
    assert_eq!(table.register("each", noop.clone()), 2);
    assert_eq!(table.register("map", noop), 1);

    assert!(table.get("each", 2).is_some());
    assert!(table.remove("each", 2));
    assert!(!table.remove("each", 2));
    assert_eq!(table.len(), 2);
}

/// **VALUE**: Verifies a dropped connection cancels every live token.
///
/// **BUG THIS CATCHES**: Would catch teardown discarding the actions unrun,
/// leaving handlers working for a front end that is gone.
#[test]
fn given_live_refs_when_all_fired_then_each_runs_and_table_empties() {
    let refs = RefTable::default();
    let fired = Arc::new(AtomicUsize::new(0));
    for seq in 1..=3 {
        let counter = Arc::clone(&fired);
        refs.register(seq, Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    }

    assert_eq!(refs.fire_all(), 3);
    assert_eq!(refs.len(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 3);
}
