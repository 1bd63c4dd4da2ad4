//! Test helpers for bridge server integration tests.
//!
//! This module provides utilities for testing the bridge server end to end:
//! - Starting a server on a free local port
//! - Connecting to the websocket endpoint
//! - Sending/receiving JSON envelopes
//! - Plain HTTP requests for the script and page routes

use bridge_core::config::BridgeConfig;
use bridge_core::ipc::{BridgeServer, ServerHandle, start_bridge_server};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test helper: Start a server with `exit_delay_ms` and an `add` binding.
pub async fn start_test_bridge_server(exit_delay_ms: i64) -> ServerHandle {
    let mut config = BridgeConfig::default();
    config.session.exit_delay_ms = exit_delay_ms;
    let server = BridgeServer::new(config).expect("Failed to build server");
    server
        .bind_function("add", |a: i64, b: i64| async move { a + b })
        .expect("Failed to bind add");
    start_bridge_server(server)
        .await
        .expect("Failed to start bridge server")
}

/// Test helper: Connect to the server's websocket endpoint.
pub async fn connect_to_server(handle: &ServerHandle) -> TestSocket {
    let (ws_stream, _) = connect_async(handle.socket_url())
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

/// Test helper: Send a JSON envelope as a text frame.
pub async fn send_envelope(ws: &mut TestSocket, envelope: Value) {
    ws.send(Message::text(envelope.to_string()))
        .await
        .expect("Failed to send message");
}

/// Test helper: Receive the next envelope with `method`, skipping others.
pub async fn receive_method(ws: &mut TestSocket, method: &str) -> Value {
    tokio::time::timeout(tokio::time::Duration::from_secs(5), async {
        loop {
            let msg = ws
                .next()
                .await
                .expect("No message received")
                .expect("Error receiving message");
            if let Message::Text(text) = msg {
                let envelope: Value =
                    serde_json::from_str(text.as_str()).expect("Failed to decode envelope");
                if envelope["method"] == method {
                    return envelope;
                }
            }
        }
    })
    .await
    .expect("Timed out waiting for envelope")
}

/// Test helper: Plain HTTP GET returning the raw response.
pub async fn http_get(handle: &ServerHandle, path: &str) -> String {
    http_request(handle, "GET", path).await
}

/// Test helper: One-shot HTTP request; the server closes the connection after
/// answering.
pub async fn http_request(handle: &ServerHandle, method: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(handle.local_addr())
        .await
        .expect("Failed to connect");
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {}\r\n\
         Content-Length: 0\r\nConnection: close\r\n\r\n",
        handle.local_addr()
    );
    stream
        .write_all(request.as_bytes())
        .await
        .expect("Failed to send request");
    let mut response = String::new();
    tokio::time::timeout(
        tokio::time::Duration::from_secs(5),
        stream.read_to_string(&mut response),
    )
    .await
    .expect("Timed out reading response")
    .expect("Failed to read response");
    response
}

/// Test helper: Wait until nothing accepts connections on the server's port.
pub async fn wait_until_not_listening(handle: &ServerHandle) -> bool {
    for _ in 0..50 {
        if TcpStream::connect(handle.local_addr()).await.is_err() {
            return true;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    false
}

/// Test helper: Check if WebSocket connection is closed.
pub async fn is_connection_closed(ws: &mut TestSocket) -> bool {
    match tokio::time::timeout(tokio::time::Duration::from_millis(500), ws.next()).await {
        Err(_) => false,
        Ok(None) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Ok(Some(Err(_))) => true,
    }
}
