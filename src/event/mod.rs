//! In-process pub/sub event dispatcher.
//!
//! The dispatcher owns a registry of named topics, each holding an ordered
//! list of handlers, and fans every emission out to the topic's current
//! handlers as independently scheduled tasks.  Producers (the gateway
//! adapter) and consumers (commands) both hold a clone of the same
//! [`Dispatcher`]; the dispatcher itself attaches no meaning to topic names
//! or payloads.
//!
//! # Payloads
//!
//! A payload is an [`EventPayload`] — `Arc<dyn Any + Send + Sync>` — shared
//! by reference across every handler of one emission.  Consumers downcast to
//! the concrete type they expect (see [`ReactionEvent`]).  The dispatcher
//! never clones or inspects it; handlers that mutate shared payload state
//! must bring their own synchronization.
//!
//! # Emission
//!
//! [`Dispatcher::emit`] is fire-and-forget: the whole lookup-and-fan-out
//! sequence runs as a spawned task and the call returns immediately.
//! [`Dispatcher::emit_and_wait`] additionally awaits a per-emission
//! completion signal that is fulfilled once every fanned-out handler has
//! finished, success or not.

pub mod dispatcher;
pub mod reaction;

pub use dispatcher::{Dispatcher, EventError, EventPayload, Handler, HandlerFuture, HandlerId};
pub use reaction::{REACTION_ADDED, REACTION_REMOVED, ReactionEvent};
