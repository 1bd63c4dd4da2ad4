//! Bridge transport: peers, sessions, lifecycle and the HTTP/WebSocket server.
//!
//! # Protocol
//!
//! Every websocket text frame holds one JSON envelope
//! `{"id": n, "method": "...", "params": {...}}`. See the `models` crate for
//! the per-method params.
//!
//! # Security
//!
//! - Binds to `127.0.0.1` by default
//! - Non-loopback connections rejected while `server.local_only` is set

mod bridge;
mod frame;
mod handle;
mod lifecycle;
pub(crate) mod peer;
mod script;
mod server;
mod session;
pub(crate) mod tables;

pub use bridge::BridgeServer;
pub use frame::{Frame, WireMessage};
pub use handle::ServerHandle;
pub use lifecycle::{ConnectionGuard, ExitDelay, Lifecycle, LifecyclePhase};
pub use peer::{CLOSE_TIMEOUT, EVAL_BINDING_NAME, Peer, PeerOptions};
pub use script::{ScriptOptions, render_client_script};
pub use server::start_bridge_server;
pub use session::SessionContext;
