//! Dispatcher — topic registry and concurrent fan-out emitter.
//!
//! # Concurrency model
//!
//! The registry map is the only shared mutable state and sits behind an
//! `std::sync::RwLock`: [`Dispatcher::register`] / [`Dispatcher::unregister`]
//! take the write lock, emission snapshots the handler list under the read
//! lock.  Neither lock is ever held across an await point, so concurrent
//! emissions proceed in parallel and mutations only contend for the bounded
//! lock hold itself.
//!
//! A handler registered concurrently with an in-flight emission may or may
//! not be included in that emission's snapshot; the next emission sees it.
//!
//! # Join barrier
//!
//! Each emission spawns its handlers into a [`JoinSet`] and drains it; a
//! handler that panics surfaces as a `JoinError` (logged) and still counts
//! toward completion, so the per-emission completion signal always fires.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, error};
use uuid::Uuid;

// ── Payload and handler types ────────────────────────────────────────────────

/// An opaque message value delivered to every handler of one emission.
///
/// The same `Arc` is cloned per handler, so all concurrently running
/// handlers observe the same underlying value.
pub type EventPayload = Arc<dyn Any + Send + Sync>;

/// A boxed, owned future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

type HandlerFn = dyn Fn(EventPayload) -> HandlerFuture + Send + Sync;

/// Identity token for a registered handler.
///
/// Issued once when the [`Handler`] is constructed.  Clones of a `Handler`
/// share the token; two independently constructed handlers never do, even
/// when their closures are textually identical.  Duplicate rejection and
/// removal both key off this token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

/// A registerable unit of behavior: a callback plus its identity token.
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    func: Arc<HandlerFn>,
}

impl Handler {
    /// Wrap an async callback.  `f` is called once per emission on the
    /// handler's topic and must not assume any ordering relative to sibling
    /// handlers of the same emission.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(EventPayload) -> HandlerFuture + Send + Sync + 'static,
    {
        Self {
            id: HandlerId(Uuid::new_v4()),
            func: Arc::new(f),
        }
    }

    /// Wrap a plain (non-async) callback.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(EventPayload) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |payload| {
            let f = Arc::clone(&f);
            Box::pin(async move { f(payload) })
        })
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    fn invoke(&self, payload: EventPayload) -> HandlerFuture {
        (self.func)(payload)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).finish()
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Validation failures returned synchronously from `register`/`unregister`.
/// Nothing here ever propagates from an emission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("topic can not be empty")]
    EmptyTopic,

    #[error("handler already registered for topic: {topic}")]
    DuplicateHandler { topic: String },

    #[error("could not find topic: {topic}")]
    TopicNotFound { topic: String },

    #[error("could not find handler for topic: {topic}")]
    HandlerNotFound { topic: String },
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

struct Inner {
    topics: RwLock<HashMap<String, Vec<Handler>>>,
}

impl Inner {
    // Handler panics happen inside spawned tasks, never under a registry
    // lock; recover from poisoning rather than propagate it.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Handler>>> {
        self.topics.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Handler>>> {
        self.topics.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// The event dispatcher.  Cheap to clone; all clones share one registry.
///
/// Constructed once at startup and passed to every collaborator that needs
/// to register handlers or emit events.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Append `handler` to `topic`'s list, creating the topic on first use.
    ///
    /// Fails with [`EventError::DuplicateHandler`] if a handler with the
    /// same identity is already registered on `topic`; the registry is left
    /// unchanged in that case.
    pub fn register(&self, topic: &str, handler: &Handler) -> Result<(), EventError> {
        if topic.is_empty() {
            return Err(EventError::EmptyTopic);
        }

        let mut topics = self.inner.write();
        let entries = topics.entry(topic.to_string()).or_default();
        if entries.iter().any(|h| h.id == handler.id) {
            return Err(EventError::DuplicateHandler {
                topic: topic.to_string(),
            });
        }

        entries.push(handler.clone());
        Ok(())
    }

    /// Remove the handler with `handler`'s identity from `topic`,
    /// preserving the relative order of the remaining entries.
    pub fn unregister(&self, topic: &str, handler: &Handler) -> Result<(), EventError> {
        let mut topics = self.inner.write();
        let entries = topics.get_mut(topic).ok_or_else(|| EventError::TopicNotFound {
            topic: topic.to_string(),
        })?;

        let idx = entries
            .iter()
            .position(|h| h.id == handler.id)
            .ok_or_else(|| EventError::HandlerNotFound {
                topic: topic.to_string(),
            })?;

        entries.remove(idx);
        Ok(())
    }

    /// Number of handlers currently registered on `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        self.inner.read().get(topic).map_or(0, Vec::len)
    }

    /// Publish `payload` on `topic`, fire-and-forget.
    ///
    /// Returns as soon as the fan-out task is scheduled; delivery happens in
    /// the background.  An unknown topic is a no-op, not an error — a topic
    /// with zero subscribers is normal.
    ///
    /// Must be called from within the Tokio runtime.
    pub fn emit(&self, topic: &str, payload: EventPayload) {
        self.dispatch(topic, payload, None);
    }

    /// Publish `payload` on `topic` and wait until every handler registered
    /// at snapshot time has finished — including handlers that panicked.
    pub async fn emit_and_wait(&self, topic: &str, payload: EventPayload) {
        let (done_tx, done_rx) = oneshot::channel();
        self.dispatch(topic, payload, Some(done_tx));
        // The fan-out task fulfills the signal on every path, so an Err here
        // can only mean the runtime is tearing down.
        let _ = done_rx.await;
    }

    /// Schedule the lookup-and-fan-out sequence without blocking the caller.
    fn dispatch(&self, topic: &str, payload: EventPayload, done: Option<oneshot::Sender<()>>) {
        let inner = Arc::clone(&self.inner);
        let topic = topic.to_string();

        tokio::spawn(async move {
            // Snapshot under the read lock; the guard must not live across
            // an await.
            let handlers = { inner.read().get(&topic).cloned() };

            let Some(handlers) = handlers else {
                debug!(%topic, "no handlers for topic");
                if let Some(tx) = done {
                    let _ = tx.send(());
                }
                return;
            };

            let mut set: JoinSet<()> = JoinSet::new();
            for handler in &handlers {
                set.spawn(handler.invoke(Arc::clone(&payload)));
            }

            // Join barrier: drain every invocation, counting panics as
            // completed.  Handler failures never reach the emitter.
            while let Some(res) = set.join_next().await {
                if let Err(e) = res {
                    error!(%topic, "event handler panicked: {e}");
                }
            }

            if let Some(tx) = done {
                let _ = tx.send(());
            }
        });
    }
}
