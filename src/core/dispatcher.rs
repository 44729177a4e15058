// src/core/dispatcher.rs

//! The process-wide command dispatcher.
//!
//! Connection tasks do not execute commands themselves; they enqueue a
//! [`UnitOfWork`] onto the dispatcher's bounded main queue and await the
//! unit's reply before reading the next frame. The dispatcher loop drains two
//! queues in fair rotation:
//!
//! - the **main queue** of submitted units. A non-blocking unit executes
//!   inline on the dispatcher task. A blocking unit (`XREAD` with a `BLOCK`
//!   policy) first acquires a slot from the bounded worker pool (when all
//!   slots are taken, the acquisition suspends the dispatcher itself) and
//!   then runs on a spawned task;
//! - the **callback queue**, onto which a finished blocking unit posts the
//!   closure that delivers its reply.
//!
//! Both queues are bounded (default capacity 10), so a full queue
//! back-pressures the producer and caps the number of in-flight requests.

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext};
use crate::core::state::ServerState;
use crate::core::{Command, OpalDBError, RespFrame};
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A closure posted to the callback queue by a completed blocking unit.
type UnitCallback = Box<dyn FnOnce() + Send + 'static>;

/// One request in flight: the parsed command plus everything needed to
/// execute it and route the reply back to its connection.
#[derive(Debug)]
pub struct UnitOfWork {
    pub command: Command,
    pub session_id: u64,
    /// Cancelled when the owning connection reports EOF or an error. A
    /// cancelled unit produces no reply.
    pub cancel: CancellationToken,
    pub reply_tx: oneshot::Sender<Result<RespFrame, OpalDBError>>,
}

/// The submission side of the dispatcher, cloned into every connection task.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    main_tx: mpsc::Sender<UnitOfWork>,
}

impl DispatcherHandle {
    /// Enqueues a unit onto the main queue, suspending the caller while the
    /// queue is full.
    pub async fn submit(&self, unit: UnitOfWork) -> Result<(), OpalDBError> {
        self.main_tx
            .send(unit)
            .await
            .map_err(|_| OpalDBError::Internal("dispatcher is no longer running".to_string()))
    }
}

/// The dispatcher task state. Constructed once at startup; `run` consumes it.
pub struct Dispatcher {
    state: Arc<ServerState>,
    main_rx: mpsc::Receiver<UnitOfWork>,
    callback_tx: mpsc::Sender<UnitCallback>,
    callback_rx: mpsc::Receiver<UnitCallback>,
    workers: Arc<Semaphore>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Dispatcher {
    pub fn new(
        state: Arc<ServerState>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> (Self, DispatcherHandle) {
        let queue_depth = state.config.queue_depth.max(1);
        let pool_size = state.config.worker_pool_size.max(1);
        let (main_tx, main_rx) = mpsc::channel(queue_depth);
        let (callback_tx, callback_rx) = mpsc::channel(queue_depth);
        let dispatcher = Self {
            state,
            main_rx,
            callback_tx,
            callback_rx,
            workers: Arc::new(Semaphore::new(pool_size)),
            shutdown_rx,
        };
        (dispatcher, DispatcherHandle { main_tx })
    }

    /// The dispatcher loop. Runs until shutdown is signalled or every
    /// `DispatcherHandle` has been dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    debug!("Dispatcher received shutdown signal.");
                    break;
                }
                Some(callback) = self.callback_rx.recv() => {
                    callback();
                }
                maybe_unit = self.main_rx.recv() => {
                    let Some(unit) = maybe_unit else { break };
                    self.handle_unit(unit).await;
                }
            }
        }
        debug!("Dispatcher stopped.");
    }

    async fn handle_unit(&self, unit: UnitOfWork) {
        // The connection may have died while the unit sat in the queue.
        if unit.cancel.is_cancelled() {
            debug!(
                "Session {}: dropping cancelled unit '{}' before execution",
                unit.session_id,
                unit.command.name()
            );
            return;
        }

        if unit.command.is_blocking() {
            self.run_on_worker(unit).await;
        } else {
            let mut ctx = ExecutionContext {
                state: self.state.clone(),
                session_id: unit.session_id,
                cancel: unit.cancel,
            };
            let result = unit.command.execute(&mut ctx).await;
            let _ = unit.reply_tx.send(result);
        }
    }

    /// Runs a blocking unit on a worker slot. Awaiting the semaphore on the
    /// dispatcher task itself is what enforces the pool ceiling: with all
    /// slots taken, no further unit is dequeued until one frees up.
    async fn run_on_worker(&self, unit: UnitOfWork) {
        let permit = match self.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Worker pool semaphore closed; dropping blocking unit.");
                return;
            }
        };

        let state = self.state.clone();
        let callback_tx = self.callback_tx.clone();
        tokio::spawn(async move {
            let UnitOfWork {
                command,
                session_id,
                cancel,
                reply_tx,
            } = unit;

            let mut ctx = ExecutionContext {
                state,
                session_id,
                cancel: cancel.clone(),
            };
            let result = command.execute(&mut ctx).await;

            // The slot is free as soon as the work is done; reply delivery
            // does not need to hold it.
            drop(permit);

            // A cancelled unit must not produce a reply.
            if cancel.is_cancelled() {
                debug!("Session {session_id}: blocking unit cancelled, suppressing reply");
                return;
            }

            let deliver: UnitCallback = Box::new(move || {
                let _ = reply_tx.send(result);
            });
            let _ = callback_tx.send(deliver).await;
        });
    }
}
