use crate::ipc_tests::helpers::{
    connect_to_server, http_get, http_request, is_connection_closed, receive_method,
    send_envelope, start_test_bridge_server, wait_until_not_listening,
};

use bridge_core::ipc::LifecyclePhase;

use serde_json::{Value, json};

// ============================================================================
// Public API tests for the bridge server
// These test the PUBLIC interface from an external consumer's perspective
// ============================================================================

/// **VALUE**: Verifies a websocket client gets the binding names, the ready
/// notification, and a working call round trip.
///
/// **WHY THIS MATTERS**: This is the whole path a page takes: upgrade, learn the
/// bindings, call one.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The upgrade route does not match the configured socket path
/// - Bindings are announced after `ready`
/// - The reply is not correlated by envelope id
#[tokio::test]
async fn given_running_server_when_client_calls_binding_then_receives_ret() {
    // GIVEN: A server with an `add` binding
    let handle = start_test_bridge_server(-1).await;
    let mut ws = connect_to_server(&handle).await;

    // THEN: Names are announced, then ready
    let announce = receive_method(&mut ws, "bind-announce").await;
    assert_eq!(announce["params"]["name"], json!(["add"]));
    receive_method(&mut ws, "ready").await;

    // WHEN: The client calls add(20, 22)
    send_envelope(
        &mut ws,
        json!({"id": 9, "method": "call", "params": {"name": "add", "seq": 1, "args": [20, 22]}}),
    )
    .await;

    // THEN: The reply carries 42 under the same id
    let ret = receive_method(&mut ws, "ret").await;
    assert_eq!(ret["id"], json!(9));
    assert_eq!(ret["params"]["result"], json!(42));
    assert_eq!(ret["params"]["error"], Value::Null);

    handle.close();
}

/// **VALUE**: Verifies the script route serves the client script listing the
/// bound names and echoing the page's query.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The script path is routed to the websocket upgrade
/// - The query string is dropped before rendering
#[tokio::test]
async fn given_running_server_when_script_requested_then_served_with_bindings() {
    let handle = start_test_bridge_server(-1).await;

    let response = http_get(&handle, "/bridge.js?lang=en").await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("text/javascript"));
    assert!(response.contains("\"add\""));
    assert!(response.contains("\"search\": \"lang=en\""));

    handle.close();
}

/// **VALUE**: Verifies unknown paths get a 404.
#[tokio::test]
async fn given_running_server_when_unknown_path_requested_then_not_found() {
    let handle = start_test_bridge_server(-1).await;

    let response = http_get(&handle, "/favicon.ico").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found"), "{response}");
    handle.close();
}

/// **VALUE**: Verifies closing the server disconnects clients and releases the
/// listener.
///
/// **BUG THIS CATCHES**: Would catch the accept loop running on after close,
/// keeping the port bound.
#[tokio::test]
async fn given_connected_client_when_server_closed_then_disconnected_and_not_listening() {
    let handle = start_test_bridge_server(-1).await;
    let mut ws = connect_to_server(&handle).await;
    receive_method(&mut ws, "ready").await;

    assert!(handle.close());
    handle.closed().await;

    assert!(is_connection_closed(&mut ws).await);
    assert!(wait_until_not_listening(&handle).await);
}

/// **VALUE**: Verifies the server exits on its own once the last client is gone
/// for longer than the exit delay.
///
/// **WHY THIS MATTERS**: Closing the browser tab must end the program.
#[tokio::test]
async fn given_exit_delay_when_last_client_leaves_then_server_closes() {
    // GIVEN: A server with a short exit delay and one client
    let handle = start_test_bridge_server(50).await;
    let mut ws = connect_to_server(&handle).await;
    receive_method(&mut ws, "ready").await;
    assert_eq!(handle.server().lifecycle().phase(), LifecyclePhase::Active);

    // WHEN: The client disconnects
    ws.close(None).await.expect("Failed to close");
    drop(ws);

    // THEN: The server closes by itself
    tokio::time::timeout(tokio::time::Duration::from_secs(5), handle.closed())
        .await
        .expect("Server should close after the exit delay");
    assert!(handle.is_closed());
}

/// **VALUE**: Verifies a page set on the server is served at the root, and the
/// root is a 404 without one.
#[tokio::test]
async fn given_page_when_root_requested_then_served_as_html() {
    let handle = start_test_bridge_server(-1).await;
    assert!(http_get(&handle, "/").await.starts_with("HTTP/1.1 404"));

    handle
        .server()
        .set_page("<html><script src=\"/bridge.js\"></script></html>");

    let response = http_get(&handle, "/index.html").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("text/html"));
    assert!(response.ends_with("<html><script src=\"/bridge.js\"></script></html>"));

    handle.close();
}

/// **VALUE**: Verifies the routes only answer GET.
///
/// **BUG THIS CATCHES**: Would catch a POST to the page or the script being
/// served as if it were a GET.
#[tokio::test]
async fn given_post_when_page_or_script_requested_then_method_not_allowed() {
    let handle = start_test_bridge_server(-1).await;
    handle.server().set_page("<html></html>");

    let page = http_request(&handle, "POST", "/").await;
    let script = http_request(&handle, "POST", "/bridge.js").await;

    assert!(page.starts_with("HTTP/1.1 405"), "{page}");
    assert!(script.starts_with("HTTP/1.1 405"), "{script}");

    handle.close();
}
