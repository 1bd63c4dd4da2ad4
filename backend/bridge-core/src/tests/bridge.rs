// Session tests for BridgeServer over an in-memory websocket pair

use crate::binding::BindingSource;
use crate::config::BridgeConfig;
use crate::error::BindingError;
use crate::ipc::{BridgeServer, LifecyclePhase, SessionContext};
use crate::tests::{recv_method, send_json, ws_pair};

use futures_util::StreamExt;
use serde_json::json;

fn server_with_delay(exit_delay_ms: i64) -> BridgeServer {
    let mut config = BridgeConfig::default();
    config.session.exit_delay_ms = exit_delay_ms;
    BridgeServer::new(config).expect("valid config")
}

/// **VALUE**: Verifies a session announces its names, sends `ready`, serves a
/// call, and a deferred source sees the session's query.
///
/// **BUG THIS CATCHES**: Would catch `ready` being sent before the names are
/// announced, so the page fires its ready hook with undefined functions.
#[tokio::test]
async fn given_session_when_opened_then_announce_precedes_ready_and_calls_work() {
    // GIVEN: A server with one static and one deferred binding
    let server = server_with_delay(-1);
    server
        .bind_function("add", |a: i64, b: i64| async move { a + b })
        .expect("bound");
    server.bind(
        BindingSource::deferred(["user"], |context: &SessionContext| {
            let user = context.query_param("user").unwrap_or_default();
            BindingSource::from_function("user", move || {
                let user = user.clone();
                async move { user }
            })
        })
        .expect("declared"),
    );

    // WHEN: A connection is served
    let (backend, mut front) = ws_pair().await;
    let session = {
        let server = server.clone();
        tokio::spawn(async move {
            server
                .serve_connection(backend, SessionContext::new("/bridge?user=ann", None))
                .await
        })
    };

    // THEN: Names first, then ready
    let announce = recv_method(&mut front, "bind-announce").await;
    assert_eq!(announce["params"]["name"], json!(["add", "user"]));
    recv_method(&mut front, "ready").await;
    assert_eq!(server.lifecycle().connections(), 1);

    // THEN: Both bindings answer
    send_json(
        &mut front,
        json!({"id": 1, "method": "call", "params": {"name": "add", "seq": 1, "args": [2, 3]}}),
    )
    .await;
    assert_eq!(recv_method(&mut front, "ret").await["params"]["result"], json!(5));
    send_json(
        &mut front,
        json!({"id": 2, "method": "call", "params": {"name": "user", "seq": 1, "args": []}}),
    )
    .await;
    assert_eq!(recv_method(&mut front, "ret").await["params"]["result"], json!("ann"));

    // WHEN: The front end goes away
    drop(front);

    // THEN: The session ends and the connection is uncounted
    session.await.expect("joined").expect("served");
    assert_eq!(server.lifecycle().connections(), 0);
    assert_eq!(server.lifecycle().phase(), LifecyclePhase::Active);
}

/// **VALUE**: Verifies a source that fails to materialize is skipped without
/// taking the other bindings down with it.
#[tokio::test]
async fn given_broken_deferred_source_when_session_opens_then_other_bindings_served() {
    let server = server_with_delay(-1);
    server
        .bind_function("ping", || async { "pong" })
        .expect("bound");
    server.bind(
        BindingSource::deferred(["broken"], |_context: &SessionContext| {
            Err(BindingError::factory("database unavailable"))
        })
        .expect("declared"),
    );

    let bindings = server.collect_bindings(&SessionContext::detached());

    assert_eq!(bindings.keys().collect::<Vec<_>>(), vec!["ping"]);
    assert_eq!(server.binding_names(), vec!["broken", "ping"]);
}

/// **VALUE**: Verifies closing the server ends a live session and closes its
/// socket.
///
/// **BUG THIS CATCHES**: Would catch sessions outliving the server and keeping
/// the process alive.
#[tokio::test]
async fn given_live_session_when_server_closed_then_session_ends() {
    let server = server_with_delay(-1);
    server
        .bind_function("ping", || async { "pong" })
        .expect("bound");
    let (backend, mut front) = ws_pair().await;
    let session = {
        let server = server.clone();
        tokio::spawn(async move {
            server
                .serve_connection(backend, SessionContext::detached())
                .await
        })
    };
    recv_method(&mut front, "ready").await;

    assert!(server.close());

    session.await.expect("joined").expect("served");
    while let Some(frame) = front.next().await {
        if frame.is_err() || frame.is_ok_and(|message| message.is_close()) {
            break;
        }
    }
    assert!(server.lifecycle().is_closed());
}

/// **VALUE**: Verifies a closed server refuses to serve new sessions.
#[tokio::test]
async fn given_closed_server_when_connection_served_then_refused() {
    let server = server_with_delay(0);
    server.close();
    let (backend, _front) = ws_pair().await;

    let result = server
        .serve_connection(backend, SessionContext::detached())
        .await;

    assert!(result.is_err());
}
