//! One end of a bridge connection.
//!
//! A [`Peer`] owns a websocket, reads envelopes off it in a background task and
//! lets the local side issue calls of its own. Both directions share one id
//! counter; replies are matched to waiters by envelope id, so any number of
//! calls may be in flight at once.
//!
//! Call errors are answered on the wire and never end the session. A frame
//! that is not a valid envelope, or names an unknown method, closes the
//! connection.
//!
//! Outgoing frames are queued to a writer task that owns the sink. Closing the
//! peer releases every waiter first; a remote that stopped reading can delay
//! the socket close by [`CLOSE_TIMEOUT`] at most.

use crate::binding::BindingSource;
use crate::dispatch::{self, Binding, CallOutcome, OutboundArg};
use crate::error::{CallError, CoreError, IpcError};
use crate::ipc::frame::{Frame, WireMessage};
use crate::ipc::session::SessionContext;
use crate::ipc::tables::{CallSequences, CallbackTable, PendingCalls, RefTable};

use models::{
    BindAnnounceParams, CallParams, CallbackCloseParams, Envelope, Method, ReadyParams,
    RefCancelParams, RetParams,
};

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures_util::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type FrameSource = Pin<Box<dyn Stream<Item = Result<Frame, String>> + Send>>;

/// Frames queued for the writer before senders wait.
const OUTGOING_CAPACITY: usize = 256;

/// Longest wait for the closing handshake once a peer shuts down.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Name of the front-end function evaluating a script.
pub const EVAL_BINDING_NAME: &str = "eval";

/// Knobs of a single connection.
#[derive(Debug, Clone, Default)]
pub struct PeerOptions {
    /// Trace every envelope sent and received.
    pub dev: bool,
    /// Answer calls to unknown names with an error instead of dropping them.
    pub reply_unknown_calls: bool,
    /// Prefix of this connection's log lines.
    pub label: String,
}

pub(crate) struct PeerShared {
    options: PeerOptions,
    next_id: AtomicU64,
    outgoing: mpsc::Sender<String>,
    pending: PendingCalls,
    pub(crate) refs: RefTable,
    callbacks: CallbackTable,
    sequences: CallSequences,
    bindings: RwLock<HashMap<String, Binding>>,
    shutdown: CancellationToken,
    done: CancellationToken,
}

/// Handle to a live connection. Clones share it.
#[derive(Clone)]
pub struct Peer {
    shared: Arc<PeerShared>,
}

impl Peer {
    /// Takes over `socket` and starts its reader and writer tasks.
    ///
    /// Works with axum's upgraded `WebSocket` and with `tokio-tungstenite`
    /// streams alike.
    pub fn attach<S, M, E>(socket: S, options: PeerOptions) -> Self
    where
        S: Stream<Item = Result<M, E>> + Sink<M, Error = E> + Send + 'static,
        M: WireMessage,
        E: Display + Send + 'static,
    {
        let (sink, source) = socket.split();
        let (outgoing, queue) = mpsc::channel(OUTGOING_CAPACITY);
        let shared = Arc::new(PeerShared {
            options,
            next_id: AtomicU64::new(0),
            outgoing,
            pending: PendingCalls::default(),
            refs: RefTable::default(),
            callbacks: CallbackTable::default(),
            sequences: CallSequences::default(),
            bindings: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            done: CancellationToken::new(),
        });
        tokio::spawn(write_loop(
            sink,
            queue,
            shared.shutdown.clone(),
            shared.options.label.clone(),
        ));
        let source = source.map(|message| {
            message
                .map(WireMessage::into_frame)
                .map_err(|e| e.to_string())
        });
        tokio::spawn(read_loop(Arc::clone(&shared), Box::pin(source)));
        Self { shared }
    }

    /// Calls the remote function `name` with plain values.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> CallOutcome {
        self.call_with(name, args.into_iter().map(OutboundArg::Value).collect())
            .await
    }

    /// Calls the remote function `name`, passing local callbacks where the
    /// arguments ask for them.
    pub async fn call_with(&self, name: &str, args: Vec<OutboundArg>) -> CallOutcome {
        let args = args
            .into_iter()
            .map(|arg| match arg {
                OutboundArg::Value(value) => value,
                OutboundArg::Callback(binding) => {
                    let seq = self.shared.callbacks.register(name, binding);
                    serde_json::json!({ "bindingName": name, "seq": seq })
                }
            })
            .collect();
        let params = CallParams {
            name: name.to_string(),
            seq: self.shared.sequences.next(name),
            args,
        };
        self.shared.request(Method::Call, &params).await
    }

    /// Evaluates `script` in the front end and returns its value.
    pub async fn eval(&self, script: &str) -> CallOutcome {
        self.call(EVAL_BINDING_NAME, vec![Value::String(script.to_string())])
            .await
    }

    /// Materializes `source` for `context` and installs the result.
    pub async fn bind(
        &self,
        source: &BindingSource,
        context: &SessionContext,
    ) -> Result<Vec<String>, CoreError> {
        let bindings = source.materialize(context)?;
        Ok(self.install(bindings).await?)
    }

    /// Adds `bindings` to the dispatch table and announces the names that
    /// were not there yet. Returns those names.
    pub async fn install(
        &self,
        bindings: BTreeMap<String, Binding>,
    ) -> Result<Vec<String>, IpcError> {
        let added: Vec<String> = {
            let mut table = self
                .shared
                .bindings
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            bindings
                .into_iter()
                .filter_map(|(name, binding)| {
                    table
                        .insert(name.clone(), binding)
                        .is_none()
                        .then_some(name)
                })
                .collect()
        };
        if added.is_empty() {
            return Ok(added);
        }
        self.shared
            .notify(Method::BindAnnounce, &BindAnnounceParams { name: added.clone() })
            .await?;
        Ok(added)
    }

    /// Tells the front end every binding is installed.
    pub async fn ready(&self) -> Result<(), IpcError> {
        self.shared.notify(Method::Ready, &ReadyParams {}).await?;
        Ok(())
    }

    /// Closes the connection. Waiters are released right away.
    pub fn close(&self) {
        self.shared.shutdown.cancel();
    }

    /// Resolves once the connection is gone and every waiter was released.
    pub async fn closed(&self) {
        self.shared.done.cancelled().await
    }

    pub fn is_closed(&self) -> bool {
        self.shared.done.is_cancelled()
    }

    pub fn binding_names(&self) -> Vec<String> {
        let table = self
            .shared
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = table.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn pending_calls(&self) -> usize {
        self.shared.pending.len()
    }

    pub fn live_refs(&self) -> usize {
        self.shared.refs.len()
    }

    pub fn live_callbacks(&self) -> usize {
        self.shared.callbacks.len()
    }
}

impl PeerShared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Sends a request and waits for the matching `ret`. Dropping the future
    /// forgets the waiter.
    pub(crate) async fn request<P: Serialize>(&self, method: Method, params: &P) -> CallOutcome {
        let id = self.next_id();
        let envelope = Envelope::new(id, method, params).map_err(CallError::encode)?;
        let mut pending = self.pending.register(id)?;
        self.write(&envelope).await.map_err(CallError::send)?;
        pending.outcome().await
    }

    /// Sends a message that expects no reply.
    pub(crate) async fn notify<P: Serialize>(
        &self,
        method: Method,
        params: &P,
    ) -> Result<u64, IpcError> {
        let id = self.next_id();
        self.write(&Envelope::new(id, method, params)?).await?;
        Ok(id)
    }

    async fn reply(&self, id: u64, params: &RetParams) -> Result<(), IpcError> {
        self.write(&Envelope::new(id, Method::Ret, params)?).await
    }

    /// Queues `envelope` for the writer task.
    async fn write(&self, envelope: &Envelope) -> Result<(), IpcError> {
        if self.shutdown.is_cancelled() {
            return Err(IpcError::closed("connection closed"));
        }
        let text = envelope.to_json()?;
        if self.options.dev {
            debug!("{}[send] {text}", self.options.label);
        }
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(IpcError::closed("connection closed")),
            queued = self.outgoing.send(text) => {
                queued.map_err(|_| IpcError::closed("writer stopped"))
            }
        }
    }

    fn handle_frame(self: &Arc<Self>, text: &str) -> Result<(), IpcError> {
        let envelope = Envelope::from_json(text)?;
        if self.options.dev {
            debug!(
                "{}[receive] {} {}",
                self.options.label, envelope.method, envelope.params
            );
        }
        let method = envelope.method()?;
        match method {
            Method::Call => {
                let call: CallParams = envelope.params_as(method)?;
                self.on_call(envelope.id, call);
            }
            Method::CallbackInvoke => {
                let call: CallParams = envelope.params_as(method)?;
                self.on_callback_invoke(envelope.id, call);
            }
            Method::Ret => self.on_ret(&envelope),
            Method::CallbackClose => {
                let close: CallbackCloseParams = envelope.params_as(method)?;
                if !self.callbacks.remove(&close.name, close.seq) {
                    debug!(
                        "{}callback-close for unknown {}#{}",
                        self.options.label, close.name, close.seq
                    );
                }
            }
            Method::RefCancel => {
                let cancel: RefCancelParams = envelope.params_as(method)?;
                if !self.refs.fire(cancel.seq) {
                    debug!(
                        "{}ref-cancel for unknown ref {}",
                        self.options.label, cancel.seq
                    );
                }
            }
            Method::BindAnnounce | Method::Ready => {
                debug!("{}ignoring {method} from front end", self.options.label);
            }
        }
        Ok(())
    }

    fn on_call(self: &Arc<Self>, id: u64, call: CallParams) {
        let binding = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call.name)
            .cloned();
        match binding {
            Some(binding) => self.spawn_dispatch(id, binding, call),
            None if self.options.reply_unknown_calls => {
                let message = format!("no binding named '{}'", call.name);
                self.spawn_reply(id, RetParams::err(message).answering(&call.name, call.seq));
            }
            None => {
                debug!(
                    "{}no binding named '{}'; dropping call {id}",
                    self.options.label, call.name
                );
            }
        }
    }

    fn on_callback_invoke(self: &Arc<Self>, id: u64, call: CallParams) {
        match self.callbacks.get(&call.name, call.seq) {
            Some(binding) => self.spawn_dispatch(id, binding, call),
            None => {
                let error = CallError::unknown_callback(&call.name, call.seq);
                warn!("{}{error}", self.options.label);
                self.spawn_reply(
                    id,
                    RetParams::err(error.wire_message()).answering(&call.name, call.seq),
                );
            }
        }
    }

    fn on_ret(&self, envelope: &Envelope) {
        let outcome = match envelope.params_as::<RetParams>(Method::Ret) {
            Ok(ret) => match ret.failure() {
                Some(error) => Err(CallError::remote(error)),
                None => Ok(ret.result),
            },
            Err(e) => {
                warn!("{}bad ret {}: {e}", self.options.label, envelope.id);
                Err(CallError::remote(e.to_string()))
            }
        };
        if self.pending.resolve(envelope.id, outcome).is_err() {
            debug!("{}ret {} matches no pending call", self.options.label, envelope.id);
        }
    }

    fn spawn_dispatch(self: &Arc<Self>, id: u64, binding: Binding, call: CallParams) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(dispatch::invoke(&binding, call.args, &shared))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(CallError::handler(format!("{} panicked", call.name))));
            let params = match outcome {
                Ok(result) => RetParams::ok(result),
                Err(e) => {
                    debug!("{}call {} failed: {e}", shared.options.label, call.name);
                    RetParams::err(e.wire_message())
                }
            };
            if let Err(e) = shared.reply(id, &params.answering(&call.name, call.seq)).await {
                warn!("{}reply to {} not delivered: {e}", shared.options.label, call.name);
            }
        });
    }

    fn spawn_reply(self: &Arc<Self>, id: u64, params: RetParams) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = shared.reply(id, &params).await {
                warn!("{}reply {id} not delivered: {e}", shared.options.label);
            }
        });
    }

    fn teardown(&self) {
        let abandoned = self.pending.abandon_all();
        if abandoned > 0 {
            warn!("{}abandoned {abandoned} pending calls", self.options.label);
        }
        let cancelled = self.refs.fire_all();
        if cancelled > 0 {
            debug!("{}cancelled {cancelled} in-flight tokens", self.options.label);
        }
        self.callbacks.clear();
        self.shutdown.cancel();
        self.done.cancel();
    }
}

async fn read_loop(shared: Arc<PeerShared>, mut source: FrameSource) {
    loop {
        let next = tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            next = source.next() => next,
        };

        match next {
            Some(Ok(Frame::Text(text))) => {
                if let Err(e) = shared.handle_frame(&text) {
                    error!("{}{e}; closing connection", shared.options.label);
                    break;
                }
            }
            Some(Ok(Frame::Binary)) => {
                warn!("{}ignoring binary frame", shared.options.label);
            }
            Some(Ok(Frame::Close)) | None => {
                info!("{}connection closed by front end", shared.options.label);
                break;
            }
            Some(Ok(Frame::Control)) => {}
            Some(Err(e)) => {
                if !shared.shutdown.is_cancelled() {
                    error!("{}read failed: {e}", shared.options.label);
                }
                break;
            }
        }
    }
    shared.teardown();
}

/// Owns the sink: writes queued frames in order until shutdown, then closes
/// the socket within [`CLOSE_TIMEOUT`].
async fn write_loop<W, M>(
    mut sink: W,
    mut queue: mpsc::Receiver<String>,
    shutdown: CancellationToken,
    label: String,
) where
    W: Sink<M> + Unpin,
    W::Error: Display,
    M: WireMessage,
{
    loop {
        let text = tokio::select! {
            _ = shutdown.cancelled() => break,
            text = queue.recv() => match text {
                Some(text) => text,
                None => break,
            },
        };
        let sent = tokio::select! {
            _ = shutdown.cancelled() => break,
            sent = sink.send(M::text(text)) => sent,
        };
        if let Err(e) = sent {
            warn!("{label}write failed: {e}; closing connection");
            shutdown.cancel();
            break;
        }
    }

    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("{label}close: {e}"),
        Err(_) => debug!("{label}close timed out after {CLOSE_TIMEOUT:?}"),
    }
}
