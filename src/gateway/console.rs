//! Console channel — drives the gateway adapter from stdin.
//!
//! Lets the whole pipeline (adapter → dispatcher → commands → transport)
//! run interactively without a platform connection:
//!
//! - `react <glyph> <message_id>` / `unreact <glyph> <message_id>` are fed
//!   to the adapter as reaction events;
//! - any other line becomes a chat message from the console user.
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C) or stdin closes.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ChatTransport, EmbedMessage, GatewayAdapter, InboundMessage, InboundReaction, SentMessage,
    TransportFuture,
};
use crate::error::AppError;

/// User id attributed to everything typed on the console.
const CONSOLE_USER: &str = "console-user";
const CONSOLE_CHANNEL: &str = "console";

// ── ConsoleTransport ─────────────────────────────────────────────────────────

/// Transport that renders outbound traffic to stdout.
pub struct ConsoleTransport;

impl ChatTransport for ConsoleTransport {
    fn send_embed(&self, channel_id: &str, embed: EmbedMessage) -> TransportFuture<SentMessage> {
        let channel_id = channel_id.to_string();
        Box::pin(async move {
            let body = serde_json::to_string_pretty(&embed)
                .map_err(|e| AppError::Gateway(format!("render embed: {e}")))?;
            let message_id = Uuid::new_v4().to_string();
            println!("[{channel_id}] message {message_id}:\n{body}");
            Ok(SentMessage {
                message_id,
                channel_id,
            })
        })
    }

    fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        glyph: &str,
    ) -> TransportFuture<()> {
        println!("[{channel_id}] bot reacted {glyph} on {message_id}");
        Box::pin(async { Ok(()) })
    }
}

// ── ConsoleChannel ───────────────────────────────────────────────────────────

pub struct ConsoleChannel {
    adapter: Arc<GatewayAdapter>,
}

impl ConsoleChannel {
    pub fn new(adapter: Arc<GatewayAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<(), AppError> {
        info!("console channel started");
        println!("─────────────────────────────────");
        println!(" Nelumbo console  (Ctrl-C to quit)");
        println!(" react/unreact <glyph> <message_id>, or type a message");
        println!("─────────────────────────────────");

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("console channel shutting down");
                    break;
                }

                line = lines.next_line() => {
                    match line {
                        Err(e) => {
                            warn!("console read error: {e}");
                            break;
                        }
                        Ok(None) => {
                            info!("console stdin closed");
                            break;
                        }
                        Ok(Some(input)) => {
                            let input = input.trim().to_string();
                            if input.is_empty() {
                                continue;
                            }
                            debug!(input = %input, "console received line");
                            self.handle_line(&input).await;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle_line(&self, input: &str) {
        let words: Vec<&str> = input.split_whitespace().collect();
        match words.as_slice() {
            ["react", glyph, message_id] => {
                self.adapter
                    .on_reaction_added(console_reaction(glyph, message_id))
                    .await;
            }
            ["unreact", glyph, message_id] => {
                self.adapter
                    .on_reaction_removed(console_reaction(glyph, message_id))
                    .await;
            }
            _ => {
                self.adapter
                    .on_message_created(InboundMessage {
                        author_id: CONSOLE_USER.into(),
                        message_id: Uuid::new_v4().to_string(),
                        channel_id: CONSOLE_CHANNEL.into(),
                        guild_id: String::new(),
                        content: input.to_string(),
                    })
                    .await;
            }
        }
    }
}

fn console_reaction(glyph: &str, message_id: &str) -> InboundReaction {
    InboundReaction {
        glyph: glyph.to_string(),
        user_id: CONSOLE_USER.into(),
        message_id: message_id.to_string(),
        channel_id: CONSOLE_CHANNEL.into(),
        guild_id: String::new(),
    }
}
