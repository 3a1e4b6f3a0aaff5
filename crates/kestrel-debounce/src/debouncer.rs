// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation message debouncer.
//!
//! Rapid messages from the same conversation are buffered and handed to the
//! batch handler as one unit once the conversation goes quiet for the
//! configured interval. A hard cap (`max_wait`) bounds total latency under
//! continuous input, and a buffer size cap bounds memory and worst-case
//! batch size.
//!
//! Buffers live only in memory: timer tasks never block process shutdown,
//! so input buffered at the moment of an abrupt termination is lost. That
//! is acceptable only because upstream chat transports redeliver on
//! reconnect.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use kestrel_config::model::DebounceConfig;
use kestrel_core::{InboundMessage, KestrelError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
// tokio's Instant, not std's: it follows the runtime clock, which tests
// drive manually via `tokio::time::advance`.
use tokio::time::Instant;
use tracing::{debug, warn};

/// Async handler invoked with the conversation key and the flushed batch.
pub type BatchHandler =
    Arc<dyn Fn(String, Vec<InboundMessage>) -> BoxFuture<'static, Result<(), KestrelError>> + Send + Sync>;

/// Callback invoked when the batch handler fails, together with the batch
/// that failed. Delivery is at-most-once per flush attempt; re-delivery is
/// the callback's decision, never the debouncer's.
pub type ErrorHandler = Arc<dyn Fn(KestrelError, Vec<InboundMessage>) + Send + Sync>;

/// Predicate deciding whether a message is worth debouncing at all.
/// Commands and other latency-sensitive input bypass buffering.
pub type DebouncePredicate = Arc<dyn Fn(&InboundMessage) -> bool + Send + Sync>;

/// Pending messages for one conversation key.
struct KeyBuffer {
    messages: Vec<InboundMessage>,
    /// When the first message entered this buffer. The flush deadline is
    /// measured from here, so an event arriving near the `max_wait`
    /// boundary gets a shorter effective quiet window. Existing behavior,
    /// kept as-is.
    first_buffered: Instant,
    /// Identifies the currently armed timer. A timer that wakes and finds
    /// a different generation lost a re-arm race and must do nothing.
    generation: u64,
    timer: JoinHandle<()>,
}

struct Inner {
    config: DebounceConfig,
    should_debounce: DebouncePredicate,
    handler: BatchHandler,
    on_error: Option<ErrorHandler>,
    buffers: Mutex<HashMap<String, KeyBuffer>>,
    generations: AtomicU64,
}

/// Buffers inbound messages per conversation and emits ordered batches.
///
/// Operations on different keys are independent. Operations on the same
/// key (an `enqueue` racing a timer-driven flush) are serialized through
/// the buffer map lock; the lock is never held across a handler await.
pub struct MessageDebouncer {
    inner: Arc<Inner>,
}

impl MessageDebouncer {
    /// Create a debouncer with the given configuration, bypass predicate,
    /// and batch handler. Failed batches are logged and dropped; use
    /// [`MessageDebouncer::with_error_handler`] to observe them instead.
    pub fn new<P, H, F>(config: DebounceConfig, should_debounce: P, handler: H) -> Self
    where
        P: Fn(&InboundMessage) -> bool + Send + Sync + 'static,
        H: Fn(String, Vec<InboundMessage>) -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), KestrelError>> + Send + 'static,
    {
        Self::build(config, should_debounce, handler, None)
    }

    /// Create a debouncer that routes failed batches to `on_error`,
    /// together with the batch that failed.
    pub fn with_error_handler<P, H, F, E>(
        config: DebounceConfig,
        should_debounce: P,
        handler: H,
        on_error: E,
    ) -> Self
    where
        P: Fn(&InboundMessage) -> bool + Send + Sync + 'static,
        H: Fn(String, Vec<InboundMessage>) -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), KestrelError>> + Send + 'static,
        E: Fn(KestrelError, Vec<InboundMessage>) + Send + Sync + 'static,
    {
        Self::build(config, should_debounce, handler, Some(Arc::new(on_error)))
    }

    fn build<P, H, F>(
        config: DebounceConfig,
        should_debounce: P,
        handler: H,
        on_error: Option<ErrorHandler>,
    ) -> Self
    where
        P: Fn(&InboundMessage) -> bool + Send + Sync + 'static,
        H: Fn(String, Vec<InboundMessage>) -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), KestrelError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                config,
                should_debounce: Arc::new(should_debounce),
                handler: Arc::new(move |key, batch| Box::pin(handler(key, batch))),
                on_error,
                buffers: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Accept one inbound message: buffer it, or process it immediately.
    ///
    /// A message that bypasses debouncing (master switch off, or predicate
    /// says no) first flushes any existing buffer for its conversation so
    /// order is preserved, then is dispatched alone.
    pub async fn enqueue(&self, msg: InboundMessage) {
        let key = msg.session_key.clone();

        if !self.inner.config.enabled || !(self.inner.should_debounce)(&msg) {
            self.flush(&key).await;
            self.inner.dispatch(&key, vec![msg]).await;
            return;
        }

        let overflow = {
            let mut buffers = self.inner.buffers.lock().await;
            let at_capacity = buffers
                .get(&key)
                .is_some_and(|entry| entry.messages.len() >= self.inner.config.max_buffer_size);

            if at_capacity {
                // Flush the existing buffer and start over with just the
                // new message; this bounds memory and worst-case batch size.
                let old = buffers.remove(&key);
                let fresh = Inner::open_buffer(&self.inner, key.clone(), msg);
                buffers.insert(key.clone(), fresh);
                old.map(|entry| {
                    entry.timer.abort();
                    entry.messages
                })
            } else if let Some(entry) = buffers.get_mut(&key) {
                entry.messages.push(msg);
                // Every arrival re-arms the timer, clamped so the batch
                // never waits past max_wait from the first buffered message.
                entry.timer.abort();
                let remaining = self
                    .inner
                    .config
                    .max_wait()
                    .saturating_sub(entry.first_buffered.elapsed());
                let delay = self.inner.config.interval().min(remaining);
                entry.generation = self.inner.next_generation();
                entry.timer =
                    Inner::spawn_timer(&self.inner, key.clone(), entry.generation, delay);
                None
            } else {
                let fresh = Inner::open_buffer(&self.inner, key.clone(), msg);
                buffers.insert(key.clone(), fresh);
                None
            }
        };

        if let Some(batch) = overflow {
            debug!(key = key.as_str(), "buffer capacity reached, forced flush");
            self.inner.dispatch(&key, batch).await;
        }
    }

    /// Flush one conversation's buffer now, cancelling its timer.
    pub async fn flush(&self, key: &str) {
        let batch = {
            let mut buffers = self.inner.buffers.lock().await;
            buffers.remove(key).map(|entry| {
                entry.timer.abort();
                entry.messages
            })
        };
        if let Some(batch) = batch {
            self.inner.dispatch(key, batch).await;
        }
    }

    /// Drain every buffered conversation, one at a time.
    ///
    /// Deliberately sequential: at shutdown, losing buffered input is worse
    /// than the added latency of serial handler calls.
    pub async fn flush_all(&self) {
        let keys: Vec<String> = {
            let buffers = self.inner.buffers.lock().await;
            buffers.keys().cloned().collect()
        };
        for key in keys {
            self.flush(&key).await;
        }
    }

    /// Number of conversations currently holding a buffer.
    pub async fn buffered_keys(&self) -> usize {
        self.inner.buffers.lock().await.len()
    }
}

impl Inner {
    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    /// Build a fresh buffer holding `msg` with a newly armed timer.
    fn open_buffer(inner: &Arc<Inner>, key: String, msg: InboundMessage) -> KeyBuffer {
        let generation = inner.next_generation();
        let delay = inner.config.interval().min(inner.config.max_wait());
        KeyBuffer {
            messages: vec![msg],
            first_buffered: Instant::now(),
            generation,
            timer: Inner::spawn_timer(inner, key, generation, delay),
        }
    }

    /// Arm a timer that flushes `key` after `delay`, unless it is re-armed
    /// or cancelled first.
    fn spawn_timer(
        inner: &Arc<Inner>,
        key: String,
        generation: u64,
        delay: std::time::Duration,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        // Anchor the deadline at arm time (now, synchronously within the
        // enqueue path) rather than at the spawned task's first poll, so the
        // configured delay is measured from when the timer is armed.
        let deadline = Instant::now() + delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.fire(&key, generation).await;
        })
    }

    /// Timer wake-up: claim the buffer only if this timer is still the
    /// armed one. A stale generation means an enqueue or an external flush
    /// won the race, and the buffer is no longer this timer's to take.
    async fn fire(&self, key: &str, generation: u64) {
        let batch = {
            let mut buffers = self.buffers.lock().await;
            match buffers.get(key) {
                Some(entry) if entry.generation == generation => {
                    buffers.remove(key).map(|entry| entry.messages)
                }
                _ => None,
            }
        };
        if let Some(batch) = batch {
            self.dispatch(key, batch).await;
        }
    }

    /// Sort the batch by receipt time and hand it to the handler.
    ///
    /// Handler failures are caught and routed to the error callback with
    /// the offending batch; they never propagate and are never retried.
    async fn dispatch(&self, key: &str, mut batch: Vec<InboundMessage>) {
        if batch.is_empty() {
            return;
        }
        // Defensive: upstream transports may deliver out of order.
        batch.sort_by_key(|m| m.received_at);

        debug!(key = key, size = batch.len(), "dispatching batch");
        if let Err(e) = (self.handler)(key.to_string(), batch.clone()).await {
            warn!(key = key, error = %e, "batch handler failed");
            if let Some(on_error) = &self.on_error {
                on_error(e, batch);
            }
        }
    }
}
