//! Nelumbo Bot — a chat bot built around an in-process pub/sub event
//! dispatcher.
//!
//! The [`event::Dispatcher`] is the architectural core: the gateway adapter
//! publishes platform events on named topics, and commands subscribe to the
//! topics they care about.  Everything else — config, storage, the command
//! layer, the console channel — hangs off that seam.

pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod logger;
pub mod storage;
