//! Chat commands.
//!
//! Each command registers any event handlers it needs at construction time
//! and is then driven by the gateway adapter when a user addresses the bot
//! with `<prefix> <command>`.

pub mod loot;

pub use loot::LootCommand;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::event::Dispatcher;
use crate::gateway::{ChatTransport, InboundMessage};
use crate::storage::Storage;

/// A boxed, owned future returned by [`Command::run`].
pub type CommandFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A unit of user-facing behavior, invoked once per addressed chat message.
pub trait Command: Send + Sync {
    /// The word that selects this command (second word of the message).
    fn name(&self) -> &str;

    /// Handle one invocation.  Implementations capture what they need and
    /// return a `Send + 'static` future; the transport is how anything gets
    /// back to the chat.
    fn run(&self, transport: Arc<dyn ChatTransport>, msg: &InboundMessage) -> CommandFuture;
}

/// Build the command table, wiring each command to the dispatcher and store.
pub fn command_table(
    dispatcher: &Dispatcher,
    storage: Arc<Storage>,
    config: &Config,
) -> Result<HashMap<String, Box<dyn Command>>, AppError> {
    let mut table: HashMap<String, Box<dyn Command>> = HashMap::new();

    let loot = loot::LootCommand::new(dispatcher, storage, &config.assets_dir)?;
    table.insert(loot.name().to_string(), Box::new(loot));

    Ok(table)
}
