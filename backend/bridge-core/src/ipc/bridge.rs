//! Server-wide state shared by every connection.
//!
//! Holds the registered binding sources and the lifecycle. Static sources are
//! materialized once per connection like deferred ones; that is cheap since
//! their bindings are reference counted.

use crate::binding::BindingSource;
use crate::config::BridgeConfig;
use crate::dispatch::{Binding, Handler};
use crate::error::{BindingError, ConfigError, IpcError};
use crate::ipc::frame::WireMessage;
use crate::ipc::lifecycle::Lifecycle;
use crate::ipc::peer::{Peer, PeerOptions};
use crate::ipc::script::{ScriptOptions, render_client_script};
use crate::ipc::session::SessionContext;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::{Sink, Stream};
use log::{error, info, warn};

struct ServerInner {
    config: BridgeConfig,
    dev: bool,
    sources: RwLock<Vec<BindingSource>>,
    page: RwLock<Option<String>>,
    lifecycle: Lifecycle,
}

/// Bindings plus lifecycle of one bridge server. Clones share them.
#[derive(Clone)]
pub struct BridgeServer {
    inner: Arc<ServerInner>,
}

impl BridgeServer {
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let dev = config.dev_enabled();
        let lifecycle = Lifecycle::new(config.exit_delay());
        Ok(Self {
            inner: Arc::new(ServerInner {
                config,
                dev,
                sources: RwLock::new(Vec::new()),
                page: RwLock::new(None),
                lifecycle,
            }),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }

    pub fn is_dev(&self) -> bool {
        self.inner.dev
    }

    /// Adds a source. Connections accepted from now on see its bindings.
    pub fn bind(&self, source: BindingSource) {
        self.inner
            .sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(source);
    }

    pub fn bind_function<H, P>(&self, name: &str, handler: H) -> Result<(), BindingError>
    where
        H: Handler<P>,
    {
        self.bind(BindingSource::from_function(name, handler)?);
        Ok(())
    }

    pub fn bind_prefixed(&self, prefix: &str, source: BindingSource) -> Result<(), BindingError> {
        self.bind(source.with_prefix(prefix)?);
        Ok(())
    }

    /// HTML served at `{prefix}/`. Pages load the client script themselves.
    pub fn set_page(&self, html: impl Into<String>) {
        *self
            .inner
            .page
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(html.into());
    }

    pub fn page(&self) -> Option<String> {
        self.inner
            .page
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sorted union of the names of every registered source.
    pub fn binding_names(&self) -> Vec<String> {
        let sources = self
            .inner
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sources
            .iter()
            .flat_map(BindingSource::names)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The flat binding map for one session. A source that fails to
    /// materialize is logged and skipped.
    pub fn collect_bindings(&self, context: &SessionContext) -> BTreeMap<String, Binding> {
        let sources = self
            .inner
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut merged = BTreeMap::new();
        for source in &sources {
            match source.materialize(context) {
                Ok(bindings) => {
                    for (name, binding) in bindings {
                        if merged.insert(name.clone(), binding).is_some() {
                            warn!("binding '{name}' registered twice; keeping the later one");
                        }
                    }
                }
                Err(e) => error!("session {}: skipping {source:?}: {e}", context.session_id()),
            }
        }
        merged
    }

    /// The client script for a page loaded with `query`.
    pub fn client_script(&self, query: &str) -> String {
        let config = &self.inner.config;
        render_client_script(&ScriptOptions {
            dev: self.inner.dev,
            tls: config.server.tls,
            prefix: config.server.prefix.clone(),
            server_path: config.server.server_path.clone(),
            search: query.trim_start_matches('?').to_string(),
            bindings: self.binding_names(),
            blur_on_close: config.client.blur_on_close,
            ..ScriptOptions::default()
        })
    }

    fn peer_options(&self, context: &SessionContext) -> PeerOptions {
        PeerOptions {
            dev: self.inner.dev,
            reply_unknown_calls: self.inner.config.session.reply_unknown_calls,
            label: format!("[{}] ", context.session_id()),
        }
    }

    /// Runs one session over an already upgraded websocket until it ends.
    ///
    /// Binds every source for `context`, announces the names, sends `ready`
    /// and waits for the connection or the server to close. Hosts with their
    /// own HTTP stack hand their upgraded sockets in here.
    pub async fn serve_connection<S, M, E>(
        &self,
        ws: S,
        context: SessionContext,
    ) -> Result<(), IpcError>
    where
        S: Stream<Item = Result<M, E>> + Sink<M, Error = E> + Send + 'static,
        M: WireMessage,
        E: Display + Send + 'static,
    {
        let _guard = self.inner.lifecycle.connection_opened()?;
        info!(
            "session {} opened ({})",
            context.session_id(),
            context.uri()
        );

        let peer = Peer::attach(ws, self.peer_options(&context));
        let bindings = self.collect_bindings(&context);
        let setup = async {
            peer.install(bindings).await?;
            peer.ready().await
        };
        if let Err(e) = setup.await {
            warn!("session {} setup failed: {e}", context.session_id());
            peer.close();
        }

        tokio::select! {
            _ = peer.closed() => {}
            _ = self.inner.lifecycle.closed() => {
                peer.close();
                peer.closed().await;
            }
        }

        context.finish();
        info!("session {} ended", context.session_id());
        Ok(())
    }

    /// Closes the server. True if this call did it.
    pub fn close(&self) -> bool {
        self.inner.lifecycle.close()
    }
}
