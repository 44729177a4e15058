// src/core/state/mod.rs

//! Defines the central `ServerState` struct shared by all connection tasks.

use crate::config::Config;
use crate::core::clock::{Clock, SystemClock};
use crate::core::storage::{KvEngine, ListEngine, StreamEngine};
use crate::core::stream_blocking::StreamBlockerManager;
use std::sync::Arc;

/// The process-wide server state: the three storage engines, the stream
/// waiter registry, the clock and the effective configuration.
///
/// There are no globals; the state is constructed once at startup and
/// threaded through connection tasks as `Arc<ServerState>`, which also lets
/// tests instantiate fully independent servers.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub kv: KvEngine,
    pub streams: StreamEngine,
    pub lists: ListEngine,
    pub stream_blockers: StreamBlockerManager,
}

impl ServerState {
    /// Creates a state backed by the system clock.
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a state with an injected clock. Expiry and stream auto-id
    /// generation both read this clock and nothing else.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            config,
            clock,
            kv: KvEngine::new(),
            streams: StreamEngine::new(),
            lists: ListEngine::new(),
            stream_blockers: StreamBlockerManager::new(),
        })
    }

    /// The current instant in clock milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
