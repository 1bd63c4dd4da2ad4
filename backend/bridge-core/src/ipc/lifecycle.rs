//! Connection counting and the exit-delay drain.
//!
//! The server starts idle, becomes active with its first connection, and
//! drains when the last one goes away. A reconnection during the drain makes it
//! active again; an expired drain closes it for good.
//!
//! ```text
//! Idle --open--> Active --last close--> Draining --timer--> Closed
//!                  ^                        |
//!                  +---------open-----------+
//! ```

use crate::error::IpcError;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// How long the server survives after its last connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDelay {
    /// Stay active with zero connections.
    Never,
    /// Close as soon as the last connection does.
    Immediate,
    After(Duration),
}

impl ExitDelay {
    /// Negative means never, zero immediate, positive a delay in milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            m if m < 0 => ExitDelay::Never,
            0 => ExitDelay::Immediate,
            m => ExitDelay::After(Duration::from_millis(m.unsigned_abs())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Active,
    Draining,
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Active { connections: usize },
    Draining { generation: u64 },
    Closed,
}

#[derive(Debug)]
struct Machine {
    state: State,
    generation: u64,
    timer: Option<AbortHandle>,
}

struct Inner {
    exit_delay: ExitDelay,
    machine: Mutex<Machine>,
    closed: CancellationToken,
}

/// Shared lifecycle of one server. Clones observe the same state.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

/// Keeps a connection counted; dropping it uncounts the connection.
#[must_use = "dropping the guard immediately uncounts the connection"]
pub struct ConnectionGuard {
    lifecycle: Lifecycle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.lifecycle.connection_closed();
    }
}

impl Lifecycle {
    pub fn new(exit_delay: ExitDelay) -> Self {
        Self {
            inner: Arc::new(Inner {
                exit_delay,
                machine: Mutex::new(Machine {
                    state: State::Idle,
                    generation: 0,
                    timer: None,
                }),
                closed: CancellationToken::new(),
            }),
        }
    }

    fn machine(&self) -> MutexGuard<'_, Machine> {
        self.inner
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn exit_delay(&self) -> ExitDelay {
        self.inner.exit_delay
    }

    pub fn phase(&self) -> LifecyclePhase {
        match self.machine().state {
            State::Idle => LifecyclePhase::Idle,
            State::Active { .. } => LifecyclePhase::Active,
            State::Draining { .. } => LifecyclePhase::Draining,
            State::Closed => LifecyclePhase::Closed,
        }
    }

    pub fn connections(&self) -> usize {
        match self.machine().state {
            State::Active { connections } => connections,
            _ => 0,
        }
    }

    /// Counts a new connection. Refused once the server is closed.
    pub fn connection_opened(&self) -> Result<ConnectionGuard, IpcError> {
        let mut machine = self.machine();
        let current = machine.state;
        machine.state = match current {
            State::Closed => return Err(IpcError::closed("server is closed")),
            State::Idle => State::Active { connections: 1 },
            State::Active { connections } => State::Active {
                connections: connections + 1,
            },
            State::Draining { .. } => {
                if let Some(timer) = machine.timer.take() {
                    timer.abort();
                }
                info!("connection resumed while draining");
                State::Active { connections: 1 }
            }
        };
        Ok(ConnectionGuard {
            lifecycle: self.clone(),
        })
    }

    fn connection_closed(&self) {
        let mut machine = self.machine();
        let State::Active { connections } = machine.state else {
            return;
        };
        if connections > 1 {
            machine.state = State::Active {
                connections: connections - 1,
            };
            return;
        }

        match self.inner.exit_delay {
            ExitDelay::Never => machine.state = State::Active { connections: 0 },
            ExitDelay::Immediate => {
                machine.state = State::Closed;
                drop(machine);
                info!("last connection closed; shutting down");
                self.inner.closed.cancel();
            }
            ExitDelay::After(delay) => {
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    machine.state = State::Closed;
                    drop(machine);
                    warn!("last connection closed outside a runtime; shutting down without delay");
                    self.inner.closed.cancel();
                    return;
                };
                machine.generation += 1;
                let generation = machine.generation;
                machine.state = State::Draining { generation };
                debug!("last connection closed; draining for {delay:?}");
                let lifecycle = self.clone();
                let timer = runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    lifecycle.drain_expired(generation);
                });
                machine.timer = Some(timer.abort_handle());
            }
        }
    }

    fn drain_expired(&self, generation: u64) {
        let mut machine = self.machine();
        let current = machine.state;
        match current {
            State::Draining { generation: pending } if pending == generation => {
                machine.state = State::Closed;
                machine.timer = None;
                drop(machine);
                info!("exit delay elapsed without reconnection; shutting down");
                self.inner.closed.cancel();
            }
            _ => debug!("stale drain timer {generation} ignored"),
        }
    }

    /// Closes the server now. True if this call did the transition.
    pub fn close(&self) -> bool {
        let mut machine = self.machine();
        if matches!(machine.state, State::Closed) {
            return false;
        }
        if let Some(timer) = machine.timer.take() {
            timer.abort();
        }
        machine.state = State::Closed;
        drop(machine);
        info!("server closed");
        self.inner.closed.cancel();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Resolves once the server reached the closed state.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }
}
