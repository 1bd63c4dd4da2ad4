use crate::dispatch::args::{Arg, ArgKind, FromArg};
use crate::dispatch::CallOutcome;
use crate::error::CallError;
use crate::ipc::peer::PeerShared;

use models::{CallParams, CallbackCloseParams, CallbackPayload, Method};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Handle to a function living on the remote side, valid while the
/// invocation that received it runs.
#[derive(Clone)]
pub struct Callback {
    inner: Arc<CallbackInner>,
}

struct CallbackInner {
    binding_name: String,
    seq: i64,
    closed: AtomicBool,
    peer: Weak<PeerShared>,
}

impl Callback {
    pub(crate) fn new(payload: CallbackPayload, peer: Weak<PeerShared>) -> Self {
        Self {
            inner: Arc::new(CallbackInner {
                binding_name: payload.binding_name,
                seq: payload.seq,
                closed: AtomicBool::new(false),
                peer,
            }),
        }
    }

    pub fn binding_name(&self) -> &str {
        &self.inner.binding_name
    }

    pub fn seq(&self) -> i64 {
        self.inner.seq
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Invokes the remote function and waits for its reply.
    pub async fn call(&self, args: Vec<Value>) -> CallOutcome {
        if self.is_closed() {
            return Err(CallError::callback_closed(self.binding_name(), self.seq()));
        }
        let peer = self
            .inner
            .peer
            .upgrade()
            .ok_or_else(CallError::connection_closed)?;
        let params = CallParams {
            name: self.inner.binding_name.clone(),
            seq: self.inner.seq,
            args,
        };
        peer.request(Method::CallbackInvoke, &params).await
    }

    pub async fn call_as<T: DeserializeOwned>(&self, args: Vec<Value>) -> Result<T, CallError> {
        let value = self.call(args).await?;
        serde_json::from_value(value)
            .map_err(|e| CallError::remote(format!("undecodable callback result: {e}")))
    }

    /// Releases the remote function. Only the first close reaches the wire.
    pub async fn close(&self) {
        if self.mark_closed() {
            self.announce_close().await;
        }
    }

    /// Flips the handle to closed; true for the caller that did the flip.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.inner.closed.swap(true, Ordering::SeqCst)
    }

    pub(crate) async fn announce_close(&self) {
        let Some(peer) = self.inner.peer.upgrade() else {
            return;
        };
        let params = CallbackCloseParams {
            name: self.inner.binding_name.clone(),
            seq: self.inner.seq,
        };
        if let Err(e) = peer.notify(Method::CallbackClose, &params).await {
            warn!(
                "callback-close for {}#{} not delivered: {e}",
                self.inner.binding_name, self.inner.seq
            );
        }
    }
}

impl FromArg for Callback {
    const KIND: ArgKind = ArgKind::Callback;

    fn from_arg(position: usize, arg: Arg) -> Result<Self, CallError> {
        match arg {
            Arg::Callback(callback) => Ok(callback),
            _ => Err(CallError::argument(position, "expected a callback")),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("binding_name", &self.inner.binding_name)
            .field("seq", &self.inner.seq)
            .field("closed", &self.is_closed())
            .finish()
    }
}
