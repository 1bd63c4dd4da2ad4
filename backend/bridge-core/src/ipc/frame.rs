//! Websocket message types a [`Peer`](crate::ipc::Peer) can run over.
//!
//! The server hands peers axum's upgraded sockets; tests and hosts that do
//! their own handshake use `tokio-tungstenite` streams. Both reduce to the few
//! frame kinds the read loop tells apart.

use axum::extract::ws::Message as AxumMessage;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;

/// An incoming websocket message, as far as the bridge cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary,
    Close,
    /// Ping and pong; the websocket layer answers those itself.
    Control,
}

/// A websocket message type the bridge can write text into and classify.
pub trait WireMessage: Send + Unpin + 'static {
    fn text(text: String) -> Self;

    fn into_frame(self) -> Frame;
}

impl WireMessage for TungsteniteMessage {
    fn text(text: String) -> Self {
        TungsteniteMessage::text(text)
    }

    fn into_frame(self) -> Frame {
        match self {
            TungsteniteMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
            TungsteniteMessage::Binary(_) => Frame::Binary,
            TungsteniteMessage::Close(_) => Frame::Close,
            TungsteniteMessage::Ping(_)
            | TungsteniteMessage::Pong(_)
            | TungsteniteMessage::Frame(_) => Frame::Control,
        }
    }
}

impl WireMessage for AxumMessage {
    fn text(text: String) -> Self {
        AxumMessage::Text(text.into())
    }

    fn into_frame(self) -> Frame {
        match self {
            AxumMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
            AxumMessage::Binary(_) => Frame::Binary,
            AxumMessage::Close(_) => Frame::Close,
            AxumMessage::Ping(_) | AxumMessage::Pong(_) => Frame::Control,
        }
    }
}
