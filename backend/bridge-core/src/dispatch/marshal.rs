//! Argument reconstruction and per-invocation cleanup.

use crate::dispatch::args::{Arg, ArgKind, Signature};
use crate::dispatch::callback::Callback;
use crate::dispatch::handler::Binding;
use crate::dispatch::token::CallToken;
use crate::dispatch::CallOutcome;
use crate::error::CallError;
use crate::ipc::peer::PeerShared;

use models::{CallbackPayload, TokenPayload};

use std::sync::{Arc, Weak};

use log::debug;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Dispatches one incoming call against `binding`.
///
/// Tokens built for the call are unregistered and cancelled, and callback
/// handles closed, once the handler returns or the future is dropped.
pub(crate) async fn invoke(
    binding: &Binding,
    raw: Vec<Value>,
    peer: &Arc<PeerShared>,
) -> CallOutcome {
    let signature = binding.signature();
    if raw.len() != signature.arity() {
        return Err(CallError::argument_count(signature.arity(), raw.len()));
    }

    let mut scope = InvocationScope::new(Arc::downgrade(peer));
    let outcome = match scope.reconstruct(signature, raw) {
        Ok(args) => binding.call(args).await,
        Err(e) => Err(e),
    };
    scope.finish().await;
    outcome
}

struct InvocationScope {
    peer: Weak<PeerShared>,
    refs: Vec<i64>,
    tokens: Vec<CancellationToken>,
    callbacks: Vec<Callback>,
}

impl InvocationScope {
    fn new(peer: Weak<PeerShared>) -> Self {
        Self {
            peer,
            refs: Vec::new(),
            tokens: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    fn reconstruct(
        &mut self,
        signature: &Signature,
        raw: Vec<Value>,
    ) -> Result<Vec<Arg>, CallError> {
        signature
            .params()
            .iter()
            .zip(raw)
            .enumerate()
            .map(|(position, (kind, value))| match kind {
                ArgKind::Value => Ok(Arg::Value(value)),
                ArgKind::Token => self.token(position, value).map(Arg::Token),
                ArgKind::Callback => self.callback(position, value).map(Arg::Callback),
            })
            .collect()
    }

    fn token(&mut self, position: usize, value: Value) -> Result<CallToken, CallError> {
        let payload: Option<TokenPayload> =
            serde_json::from_value(value).map_err(|e| CallError::argument(position, e))?;
        let token = CallToken::new(payload.map(|p| p.seq));

        if let (Some(payload), Some(peer)) = (payload, self.peer.upgrade()) {
            let cancel = token.token().clone();
            peer.refs.register(payload.seq, Box::new(move || cancel.cancel()));
            self.refs.push(payload.seq);
        }
        self.tokens.push(token.token().clone());
        Ok(token)
    }

    fn callback(&mut self, position: usize, value: Value) -> Result<Callback, CallError> {
        let payload: CallbackPayload =
            serde_json::from_value(value).map_err(|e| CallError::argument(position, e))?;
        let callback = Callback::new(payload, self.peer.clone());
        self.callbacks.push(callback.clone());
        Ok(callback)
    }

    /// Synchronous half of cleanup. Returns the callbacks whose close still
    /// has to be announced.
    fn release(&mut self) -> Vec<Callback> {
        if let Some(peer) = self.peer.upgrade() {
            for seq in self.refs.drain(..) {
                peer.refs.unregister(seq);
            }
        }
        for token in self.tokens.drain(..) {
            token.cancel();
        }
        self.callbacks
            .drain(..)
            .filter(|callback| callback.mark_closed())
            .collect()
    }

    async fn finish(mut self) {
        for callback in self.release() {
            callback.announce_close().await;
        }
    }
}

impl Drop for InvocationScope {
    fn drop(&mut self) {
        let pending = self.release();
        if pending.is_empty() {
            return;
        }
        debug!("invocation dropped early; closing {} callbacks", pending.len());
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                for callback in pending {
                    callback.announce_close().await;
                }
            });
        }
    }
}
