mod binding;
mod bridge;
mod config;
mod script;
mod tables;

use crate::binding::BindingSource;
use crate::ipc::{Peer, PeerOptions, SessionContext};

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::DuplexStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;

pub(crate) type TestSocket = WebSocketStream<DuplexStream>;

/// Two websocket ends joined by an in-memory pipe: (backend, front end).
pub(crate) async fn ws_pair() -> (TestSocket, TestSocket) {
    let (backend, front) = tokio::io::duplex(64 * 1024);
    let backend = WebSocketStream::from_raw_socket(backend, Role::Server, None).await;
    let front = WebSocketStream::from_raw_socket(front, Role::Client, None).await;
    (backend, front)
}

/// A backend peer serving `source`, plus the raw front-end socket.
pub(crate) async fn backend_with(
    source: BindingSource,
    options: PeerOptions,
) -> (Peer, TestSocket) {
    let (backend, front) = ws_pair().await;
    let peer = Peer::attach(backend, options);
    peer.bind(&source, &SessionContext::detached())
        .await
        .expect("bindings install");
    (peer, front)
}

pub(crate) async fn send_json(ws: &mut TestSocket, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("frame sent");
}

/// Next envelope with `method`, skipping everything else.
pub(crate) async fn recv_method(ws: &mut TestSocket, method: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let frame = ws
                .next()
                .await
                .expect("socket open")
                .expect("frame readable");
            if let Message::Text(text) = frame {
                let envelope: Value = serde_json::from_str(text.as_str()).expect("json frame");
                if envelope["method"] == method {
                    return envelope;
                }
            }
        }
    })
    .await
    .expect("envelope arrived in time")
}
