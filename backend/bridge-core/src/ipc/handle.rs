//! Bridge server handle type.

use crate::error::IpcError;
use crate::ipc::bridge::BridgeServer;
use crate::launcher::Launcher;

use std::net::SocketAddr;

/// Handle to a running bridge server.
///
/// Returned by [`start_bridge_server`](crate::ipc::start_bridge_server).
/// Dropping the handle does not stop the server; call [`ServerHandle::close`]
/// or let the exit delay run out.
///
/// # Examples
///
/// ```no_run
/// use bridge_core::config::BridgeConfig;
/// use bridge_core::ipc::{BridgeServer, start_bridge_server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = BridgeServer::new(BridgeConfig::default())?;
///     server.bind_function("add", |a: i64, b: i64| async move { a + b })?;
///     let handle = start_bridge_server(server).await?;
///     println!("script at {}", handle.script_url());
///     handle.closed().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ServerHandle {
    server: BridgeServer,
    local_addr: SocketAddr,
}

impl ServerHandle {
    pub(crate) fn new(server: BridgeServer, local_addr: SocketAddr) -> Self {
        Self { server, local_addr }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn server(&self) -> &BridgeServer {
        &self.server
    }

    fn http_scheme(&self) -> &'static str {
        if self.server.config().server.tls {
            "https"
        } else {
            "http"
        }
    }

    /// Base URL of the server, ending in `/`.
    pub fn url(&self) -> String {
        format!(
            "{}://{}{}/",
            self.http_scheme(),
            self.local_addr,
            self.server.config().server.prefix
        )
    }

    pub fn script_url(&self) -> String {
        format!(
            "{}://{}{}",
            self.http_scheme(),
            self.local_addr,
            self.server.config().script_path()
        )
    }

    pub fn socket_url(&self) -> String {
        let scheme = if self.server.config().server.tls {
            "wss"
        } else {
            "ws"
        };
        format!(
            "{scheme}://{}{}",
            self.local_addr,
            self.server.config().socket_path()
        )
    }

    /// Closes the server. True if this call did it.
    pub fn close(&self) -> bool {
        self.server.close()
    }

    pub fn is_closed(&self) -> bool {
        self.server.lifecycle().is_closed()
    }

    /// Resolves once the server is closed.
    pub async fn closed(&self) {
        self.server.lifecycle().closed().await
    }

    /// Opens `url` with `launcher`, waits for the server to close, then closes
    /// the launcher.
    pub async fn run_with<L: Launcher + ?Sized>(
        &self,
        launcher: &L,
        url: &str,
    ) -> Result<(), IpcError> {
        launcher.open(url)?;
        self.closed().await;
        launcher.close();
        Ok(())
    }
}
