use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// What a deferred binding factory knows about the connection it builds for.
///
/// Cloning shares the same done signal.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: Uuid,
    uri: String,
    remote_addr: Option<SocketAddr>,
    done: CancellationToken,
}

impl SessionContext {
    /// `uri` is the request target of the websocket upgrade, e.g. `/bridge?user=1`.
    pub fn new(uri: impl Into<String>, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            uri: uri.into(),
            remote_addr,
            done: CancellationToken::new(),
        }
    }

    /// A context not tied to any connection.
    pub fn detached() -> Self {
        Self::new("/", None)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn parsed(&self) -> Option<Url> {
        let base = Url::parse("http://localhost/").ok()?;
        base.join(&self.uri).ok()
    }

    /// Last value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.parsed()?
            .query_pairs()
            .filter(|(key, _)| key == name)
            .last()
            .map(|(_, value)| value.into_owned())
    }

    /// Raw query string without the leading `?`, empty when there is none.
    pub fn query(&self) -> String {
        self.parsed()
            .and_then(|url| url.query().map(str::to_string))
            .unwrap_or_default()
    }

    /// Cancelled when the session's connection has ended.
    pub fn done(&self) -> &CancellationToken {
        &self.done
    }

    pub(crate) fn finish(&self) {
        self.done.cancel();
    }
}
