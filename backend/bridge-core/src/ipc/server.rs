//! Bridge HTTP and WebSocket server.
//!
//! One axum router serves:
//!
//! - `GET {prefix}{server_path}`: websocket upgrade, one bridge session each
//! - `GET {prefix}{server_path}.js`: the generated client script
//! - `GET {prefix}/`: the page set with [`BridgeServer::set_page`], if any
//! - anything else: `404 Not Found`
//!
//! # Security
//!
//! - Binds to the configured address (`127.0.0.1` by default)
//! - Answers `403 Forbidden` to non-loopback peers unless `server.local_only`
//!   is off

use crate::error::ipc::IpcError;
use crate::ipc::bridge::BridgeServer;
use crate::ipc::handle::ServerHandle;
use crate::ipc::session::SessionContext;

use std::net::SocketAddr;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, OriginalUri, RawQuery, Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use log::{debug, error, info, warn};
use tokio::net::TcpListener;
use tokio::spawn as TokioSpawn;

const NO_CACHE: &str = "no-cache";

/// Starts listening on `server.addr` and serves connections in the background.
///
/// The listener is released once the server's lifecycle reaches the closed
/// state, either through [`ServerHandle::close`] or the exit delay.
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the address cannot be bound.
pub async fn start_bridge_server(server: BridgeServer) -> Result<ServerHandle, IpcError> {
    let listener = TcpListener::bind(&server.config().server.addr).await?;
    let local_addr = listener.local_addr()?;

    info!("Bridge server listening on {}", local_addr);

    let app = router(server.clone()).into_make_service_with_connect_info::<SocketAddr>();
    let lifecycle = server.lifecycle().clone();
    TokioSpawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { lifecycle.closed().await })
            .await;
        if let Err(e) = served {
            error!("Bridge server on {} failed: {}", local_addr, e);
        }
        info!("Bridge server on {} stopped listening", local_addr);
    });

    Ok(ServerHandle::new(server, local_addr))
}

fn router(server: BridgeServer) -> Router {
    let socket_path = server.config().socket_path();
    let script_path = server.config().script_path();
    Router::new()
        .route(&socket_path, get(upgrade))
        .route(&script_path, get(script))
        .fallback(page)
        .layer(middleware::from_fn_with_state(server.clone(), loopback_only))
        .with_state(server)
}

/// SECURITY: Reject non-loopback peers while `server.local_only` is set.
async fn loopback_only(
    State(server): State<BridgeServer>,
    request: Request,
    next: Next,
) -> Response {
    if server.config().server.local_only {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        match peer {
            Some(addr) if addr.ip().is_loopback() => {}
            Some(addr) => {
                warn!("Rejected non-loopback connection from {}", addr);
                return StatusCode::FORBIDDEN.into_response();
            }
            None => {
                warn!("Rejected connection with unknown peer address");
                return StatusCode::FORBIDDEN.into_response();
            }
        }
    }
    next.run(request).await
}

async fn upgrade(
    State(server): State<BridgeServer>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    ws: WebSocketUpgrade,
) -> Response {
    if server.lifecycle().is_closed() {
        debug!("Refused upgrade from {}: server closed", addr);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    debug!("Client connecting from {}", addr);
    let context = SessionContext::new(uri.to_string(), Some(addr));
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = server.serve_connection(socket, context).await {
            warn!("Connection from {} failed: {}", addr, e);
        }
    })
}

async fn script(State(server): State<BridgeServer>, RawQuery(query): RawQuery) -> Response {
    let body = server.client_script(query.as_deref().unwrap_or_default());
    (
        [
            (CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (CACHE_CONTROL, NO_CACHE),
        ],
        body,
    )
        .into_response()
}

/// Serves the page on its root paths; everything else is not found.
async fn page(State(server): State<BridgeServer>, method: Method, uri: Uri) -> Response {
    if server.config().is_page_path(uri.path()) {
        if let Some(page) = server.page() {
            if method != Method::GET {
                return StatusCode::METHOD_NOT_ALLOWED.into_response();
            }
            return ([(CACHE_CONTROL, NO_CACHE)], Html(page)).into_response();
        }
    }
    debug!("No route for {} {}", method, uri.path());
    (StatusCode::NOT_FOUND, "not found").into_response()
}
