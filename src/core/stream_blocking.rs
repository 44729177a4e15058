// src/core/stream_blocking.rs

//! Manages clients that are blocked waiting for data on one or more streams,
//! for the `XREAD` command with the `BLOCK` option.
//!
//! The notification path is best-effort: `XADD` walks the waiter queues for
//! its key and fires each registered waker once. A notification published
//! while no waiter is registered is simply dropped. Correctness relies on the
//! rescan-then-suspend discipline on the reader side: a waiter always
//! registers first and rescans the stream before suspending, so an append
//! can never fall into the gap between scan and registration.

use bytes::Bytes;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a blocked stream read was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamWaitOutcome {
    /// An append was published on one of the watched keys.
    Woken,
    /// The deadline elapsed before any matching append.
    TimedOut,
    /// The connection went away; no reply must be produced.
    Cancelled,
}

/// The waker for stream blocking only needs to signal that data has arrived.
type Waker = oneshot::Sender<()>;

/// A shareable, thread-safe waker. The `Option` allows it to be `take()`-n,
/// ensuring it is only fired once.
type SharedWaker = Arc<Mutex<Option<Waker>>>;

/// Holds information about a waiting client, including its session id so a
/// disconnecting client's waiters can be swept out.
#[derive(Clone, Debug)]
struct WaiterInfo {
    session_id: u64,
    waker: SharedWaker,
}

/// Manages all clients currently blocked on stream reads.
#[derive(Debug, Default)]
pub struct StreamBlockerManager {
    // Key: the name of the stream being watched.
    // Value: a queue of waiters for clients waiting on this stream.
    waiters: DashMap<Bytes, VecDeque<WaiterInfo>>,
}

impl StreamBlockerManager {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a waiter under every key in `keys` and returns the handle
    /// used to suspend on it. The caller must rescan the streams *after*
    /// registering and *before* calling [`RegisteredWaiter::wait`].
    pub fn register<'a>(&'a self, keys: &[Bytes], session_id: u64) -> RegisteredWaiter<'a> {
        let (tx, rx) = oneshot::channel();
        let shared_waker: SharedWaker = Arc::new(Mutex::new(Some(tx)));
        let info = WaiterInfo {
            session_id,
            waker: shared_waker.clone(),
        };
        for key in keys {
            self.waiters
                .entry(key.clone())
                .or_default()
                .push_back(info.clone());
        }
        debug!(
            "Session {}: registered stream waiter on {} key(s)",
            session_id,
            keys.len()
        );
        RegisteredWaiter {
            manager: self,
            keys: keys.to_vec(),
            waker: shared_waker,
            rx,
        }
    }

    /// Wakes every client waiting on `key`. Called by `XADD` after its write
    /// lock has been released.
    pub fn notify(&self, key: &Bytes) {
        if let Some(mut queue) = self.waiters.get_mut(key) {
            if queue.is_empty() {
                return;
            }
            debug!(
                "Notifying {} waiter(s) for stream '{}'",
                queue.len(),
                String::from_utf8_lossy(key)
            );

            // Wake up all waiters. `take()` ensures each is only fired once.
            while let Some(info) = queue.pop_front() {
                if let Ok(mut guard) = info.waker.lock()
                    && let Some(waker) = guard.take()
                {
                    let _ = waker.send(());
                }
            }
        }
    }

    /// Cleans up a specific waker from all associated key queues after it has
    /// been used, timed out or been cancelled.
    fn remove_waiter(&self, keys: &[Bytes], waker_to_remove: &SharedWaker) {
        for key in keys {
            if let Some(mut queue) = self.waiters.get_mut(key) {
                queue.retain(|info| !Arc::ptr_eq(&info.waker, waker_to_remove));
                if queue.is_empty() {
                    drop(queue);
                    self.waiters.remove(key);
                }
            }
        }
    }

    /// Removes all wakers for a given session id. Called when a client
    /// connection closes to prevent dangling wakers.
    pub fn remove_waiters_for_session(&self, session_id: u64) {
        self.waiters.iter_mut().for_each(|mut queue| {
            queue.retain(|info| info.session_id != session_id);
        });
        self.waiters.retain(|_, queue| !queue.is_empty());
        debug!(
            "Removed any pending stream waiters for session_id {}",
            session_id
        );
    }

    /// The number of registered waiters across all keys (test observability).
    pub fn waiter_count(&self) -> usize {
        self.waiters.iter().map(|queue| queue.len()).sum()
    }
}

/// A registered waiter, deregistered on every exit path of [`Self::wait`].
#[derive(Debug)]
pub struct RegisteredWaiter<'a> {
    manager: &'a StreamBlockerManager,
    keys: Vec<Bytes>,
    waker: SharedWaker,
    rx: oneshot::Receiver<()>,
}

impl RegisteredWaiter<'_> {
    /// Removes the waiter without suspending. Used when the post-registration
    /// rescan already found data or the deadline has passed.
    pub fn deregister(self) {
        self.manager.remove_waiter(&self.keys, &self.waker);
    }

    /// Suspends until a notification fires, the remaining time elapses, or
    /// the connection is cancelled, whichever comes first. `None` means wait
    /// forever (`BLOCK 0`).
    pub async fn wait(
        self,
        remaining: Option<Duration>,
        cancel: &CancellationToken,
    ) -> StreamWaitOutcome {
        let RegisteredWaiter {
            manager,
            keys,
            waker,
            mut rx,
        } = self;

        let outcome = tokio::select! {
            _ = cancel.cancelled() => StreamWaitOutcome::Cancelled,
            woken = async {
                match remaining {
                    Some(d) => timeout(d, &mut rx).await.is_ok(),
                    None => {
                        let _ = (&mut rx).await;
                        true
                    }
                }
            } => {
                if woken {
                    StreamWaitOutcome::Woken
                } else {
                    StreamWaitOutcome::TimedOut
                }
            }
        };

        manager.remove_waiter(&keys, &waker);
        outcome
    }
}
