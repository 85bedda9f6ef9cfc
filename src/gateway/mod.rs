//! Chat-platform boundary.
//!
//! The platform connection itself lives outside this crate; what crosses
//! the boundary is:
//!
//! - **inbound** platform events ([`InboundMessage`], [`InboundReaction`]),
//!   fed to the [`GatewayAdapter`] by whatever owns the connection (a real
//!   gateway client, the console channel, a test);
//! - **outbound** actions behind the [`ChatTransport`] trait (send an embed
//!   message, add a reaction).
//!
//! The adapter is the only producer on the event dispatcher: it drops
//! self-originated events, digests the reaction glyph, and publishes a
//! [`ReactionEvent`] on the matching topic.  Chat messages addressed to the
//! bot (`<prefix> <command>`) are routed to the command table.

pub mod console;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::commands::Command;
use crate::error::AppError;
use crate::event::{Dispatcher, EventPayload, REACTION_ADDED, REACTION_REMOVED, ReactionEvent};

// ── Inbound events ───────────────────────────────────────────────────────────

/// A chat message observed on the platform.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub author_id: String,
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub content: String,
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone)]
pub struct InboundReaction {
    pub glyph: String,
    pub user_id: String,
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: String,
}

// ── Outbound transport ───────────────────────────────────────────────────────

/// An embed-style message as the platform renders it.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedMessage {
    pub color: u32,
    pub image_url: String,
    pub timestamp: String,
    /// Attachment file name (digest + extension).
    pub file_name: String,
    pub mime_type: String,
}

/// Identifiers of a message the transport has posted.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message_id: String,
    pub channel_id: String,
}

/// A boxed, owned future returned by a transport call.
pub type TransportFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'static>>;

/// Outbound half of the platform boundary.
///
/// Implementations must be `Send + Sync`; commands hold the transport as
/// `Arc<dyn ChatTransport>` and call it from spawned tasks.
pub trait ChatTransport: Send + Sync {
    /// Post an embed to `channel_id`; resolves to the posted message's ids.
    fn send_embed(&self, channel_id: &str, embed: EmbedMessage) -> TransportFuture<SentMessage>;

    /// Add a reaction glyph to an existing message.
    fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        glyph: &str,
    ) -> TransportFuture<()>;
}

/// Hex-encoded SHA-256 digest of a reaction glyph name.
///
/// Gives every glyph a fixed-width identifier regardless of how the
/// platform encodes it.
pub fn glyph_digest(glyph: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(glyph.as_bytes());
    hex::encode(hasher.finalize())
}

// ── GatewayAdapter ───────────────────────────────────────────────────────────

/// Translates platform events into dispatcher emissions and command runs.
pub struct GatewayAdapter {
    dispatcher: Dispatcher,
    commands: HashMap<String, Box<dyn Command>>,
    transport: Arc<dyn ChatTransport>,
    /// The bot's own user id; events it caused itself are dropped.
    bot_user_id: String,
    command_prefix: String,
}

impl GatewayAdapter {
    pub fn new(
        dispatcher: Dispatcher,
        commands: HashMap<String, Box<dyn Command>>,
        transport: Arc<dyn ChatTransport>,
        bot_user_id: impl Into<String>,
        command_prefix: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            commands,
            transport,
            bot_user_id: bot_user_id.into(),
            command_prefix: command_prefix.into(),
        }
    }

    /// Route a chat message of the form `<prefix> <command> …` to the
    /// command table.  Anything else — including the bot's own messages —
    /// is ignored.  Command failures are logged, never propagated.
    pub async fn on_message_created(&self, msg: InboundMessage) {
        if msg.author_id == self.bot_user_id {
            return;
        }

        let mut words = msg.content.split_whitespace();
        let (Some(prefix), Some(name)) = (words.next(), words.next()) else {
            return;
        };
        if prefix != self.command_prefix {
            return;
        }

        let Some(command) = self.commands.get(name) else {
            debug!(command = %name, "unknown command");
            return;
        };

        if let Err(e) = command.run(Arc::clone(&self.transport), &msg).await {
            warn!(command = %name, "command failed: {e}");
        }
    }

    /// Publish a [`ReactionEvent`] on [`REACTION_ADDED`].
    pub async fn on_reaction_added(&self, reaction: InboundReaction) {
        self.publish_reaction(REACTION_ADDED, reaction).await;
    }

    /// Publish a [`ReactionEvent`] on [`REACTION_REMOVED`].
    pub async fn on_reaction_removed(&self, reaction: InboundReaction) {
        self.publish_reaction(REACTION_REMOVED, reaction).await;
    }

    async fn publish_reaction(&self, topic: &str, reaction: InboundReaction) {
        if reaction.user_id == self.bot_user_id {
            return;
        }

        let glyph_hash = glyph_digest(&reaction.glyph);
        info!(
            message_id = %reaction.message_id,
            glyph = %glyph_hash,
            %topic,
            "reaction observed"
        );

        let payload: EventPayload = Arc::new(ReactionEvent {
            glyph_hash,
            glyph: reaction.glyph,
            user_id: reaction.user_id,
            message_id: reaction.message_id,
            channel_id: reaction.channel_id,
            guild_id: reaction.guild_id,
        });

        // Await delivery: by the time the adapter returns, every subscriber
        // has seen the reaction.
        self.dispatcher.emit_and_wait(topic, payload).await;
    }
}
