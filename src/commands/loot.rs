//! Loot command — drop a random image from the loot folder.
//!
//! On invocation: pick a random file from `<assets>/loot`, post it as a
//! rarity-colored embed, seed it with the 👍/👎 reactions, and record the
//! image and message rows.  At construction the command registers two
//! dispatcher handlers that keep the message's like counter in step with
//! reactions as they arrive.

use std::fs::{self, File};
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rand_core::{OsRng, RngCore as _};
use tracing::{debug, error, warn};

use super::{Command, CommandFuture};
use crate::error::AppError;
use crate::event::{
    Dispatcher, Handler, REACTION_ADDED, REACTION_REMOVED, ReactionEvent,
};
use crate::gateway::{ChatTransport, EmbedMessage, InboundMessage};
use crate::storage::{Storage, sha256_hex};

pub const LIKE_GLYPH: &str = "👍";
pub const DISLIKE_GLYPH: &str = "👎";

// ── Rarity tiers ─────────────────────────────────────────────────────────────

/// Embed accent color per rarity tier.
#[derive(Debug, Clone, Copy)]
pub struct Rarity {
    pub name: &'static str,
    pub color: u32,
}

const RARITIES: &[(&str, Rarity)] = &[
    ("common", Rarity { name: "Common", color: 0xDEDEDE }),
    ("uncommon", Rarity { name: "Uncommon", color: 0x1EFF00 }),
    ("rare", Rarity { name: "Rare", color: 0x0070DD }),
    ("epic", Rarity { name: "Epic", color: 0xA335EE }),
    ("legendary", Rarity { name: "Legendary", color: 0xFF8000 }),
];

fn rarity(key: &str) -> Option<Rarity> {
    RARITIES.iter().find(|(k, _)| *k == key).map(|(_, r)| *r)
}

// ── MIME sniffing ────────────────────────────────────────────────────────────

/// Detect an image MIME type from the file's leading bytes.
fn detect_mime(head: &[u8]) -> &'static str {
    if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        "image/gif"
    } else if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if head.starts_with(b"BM") {
        "image/bmp"
    } else if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

fn mime_to_ext(mime: &str) -> &'static str {
    match mime {
        "image/png" => ".png",
        "image/bmp" => ".bmp",
        "image/gif" => ".gif",
        "image/jpeg" => ".jpeg",
        "image/webp" => ".webp",
        _ => "",
    }
}

// ── LootCommand ──────────────────────────────────────────────────────────────

struct LootState {
    loot_dir: PathBuf,
    storage: Arc<Storage>,
}

pub struct LootCommand {
    state: Arc<LootState>,
    dispatcher: Dispatcher,
    /// Kept for identity: unregistered on drop.
    reaction_handlers: Vec<(&'static str, Handler)>,
}

impl LootCommand {
    /// Create the command, its loot directory, and its reaction handlers.
    pub fn new(
        dispatcher: &Dispatcher,
        storage: Arc<Storage>,
        assets_dir: &Path,
    ) -> Result<Self, AppError> {
        let loot_dir = assets_dir.join("loot");
        fs::create_dir_all(&loot_dir)?;

        let state = Arc::new(LootState { loot_dir, storage });

        let on_added = {
            let state = Arc::clone(&state);
            Handler::from_sync(move |payload| {
                if let Some(event) = payload.downcast_ref::<ReactionEvent>() {
                    handle_reaction(&state, event, false);
                }
            })
        };
        let on_removed = {
            let state = Arc::clone(&state);
            Handler::from_sync(move |payload| {
                if let Some(event) = payload.downcast_ref::<ReactionEvent>() {
                    handle_reaction(&state, event, true);
                }
            })
        };

        dispatcher.register(REACTION_ADDED, &on_added)?;
        dispatcher.register(REACTION_REMOVED, &on_removed)?;

        Ok(Self {
            state,
            dispatcher: dispatcher.clone(),
            reaction_handlers: vec![(REACTION_ADDED, on_added), (REACTION_REMOVED, on_removed)],
        })
    }
}

impl Drop for LootCommand {
    fn drop(&mut self) {
        for (topic, handler) in &self.reaction_handlers {
            if let Err(e) = self.dispatcher.unregister(topic, handler) {
                debug!(%topic, "unregister on drop: {e}");
            }
        }
    }
}

impl Command for LootCommand {
    fn name(&self) -> &str {
        "loot"
    }

    fn run(&self, transport: Arc<dyn ChatTransport>, msg: &InboundMessage) -> CommandFuture {
        let state = Arc::clone(&self.state);
        let channel_id = msg.channel_id.clone();
        let guild_id = msg.guild_id.clone();

        Box::pin(async move {
            let prepared = prepare_drop(&state.loot_dir).map_err(|e| {
                error!("could not prepare loot drop: {e}");
                e
            })?;

            let embed = EmbedMessage {
                color: rarity("common").map(|r| r.color).unwrap_or(0xDEDEDE),
                image_url: format!("attachment://{}", prepared.attachment_name),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                file_name: prepared.attachment_name.clone(),
                mime_type: prepared.mime.to_string(),
            };

            let sent = transport.send_embed(&channel_id, embed).await.map_err(|e| {
                error!("could not send loot message: {e}");
                e
            })?;

            transport
                .add_reaction(&sent.channel_id, &sent.message_id, LIKE_GLYPH)
                .await?;
            transport
                .add_reaction(&sent.channel_id, &sent.message_id, DISLIKE_GLYPH)
                .await?;

            let image_id = state.storage.save_loot_image(
                &prepared.file_name,
                prepared.mime,
                &prepared.digest,
            )?;
            state.storage.save_loot_message(
                &sent.message_id,
                &sent.channel_id,
                &guild_id,
                image_id,
            )?;

            Ok(())
        })
    }
}

/// Keep the like counter in step with one observed reaction.
///
/// Only the 👍 glyph moves the counter; 👎 is seeded on the message for
/// symmetry but tracked nowhere.  Failures stay here — a reaction handler
/// has no caller to report to.
fn handle_reaction(state: &LootState, event: &ReactionEvent, removed: bool) {
    match event.glyph.as_str() {
        LIKE_GLYPH => {
            let result = if removed {
                state.storage.remove_like(&event.message_id)
            } else {
                state.storage.add_like(&event.message_id)
            };
            if let Err(e) = result {
                warn!(message_id = %event.message_id, "could not record reaction: {e}");
            }
        }
        DISLIKE_GLYPH => {
            debug!(message_id = %event.message_id, removed, "dislike observed");
        }
        _ => {}
    }
}

// ── Drop preparation ─────────────────────────────────────────────────────────

struct PreparedDrop {
    /// Original file name inside the loot folder.
    file_name: String,
    /// Digest-based attachment name (`<sha256><ext>`).
    attachment_name: String,
    /// Hex digest of the original name — the stable image key.
    digest: String,
    mime: &'static str,
}

fn prepare_drop(loot_dir: &Path) -> Result<PreparedDrop, AppError> {
    let path = pick_random_file(loot_dir)?;

    let mut head = [0u8; 512];
    let mut file = File::open(&path)?;
    let n = file.read(&mut head)?;
    let mime = detect_mime(&head[..n]);

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digest = sha256_hex(&file_name);
    let attachment_name = format!("{digest}{}", mime_to_ext(mime));

    Ok(PreparedDrop {
        file_name,
        attachment_name,
        digest,
        mime,
    })
}

fn pick_random_file(dir: &Path) -> Result<PathBuf, AppError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .collect();

    if files.is_empty() {
        return Err(AppError::Command(format!(
            "no loot files in {}",
            dir.display()
        )));
    }

    let mut buf = [0u8; 8];
    OsRng.fill_bytes(&mut buf);
    let idx = (u64::from_le_bytes(buf) % files.len() as u64) as usize;
    Ok(files.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{SentMessage, TransportFuture};
    use crate::storage::run_migrations;
    use std::sync::Mutex;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    struct FixedTransport {
        calls: Mutex<Vec<String>>,
    }

    impl FixedTransport {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatTransport for FixedTransport {
        fn send_embed(
            &self,
            channel_id: &str,
            embed: EmbedMessage,
        ) -> TransportFuture<SentMessage> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("embed:{}", embed.mime_type));
            let channel_id = channel_id.to_string();
            Box::pin(async move {
                Ok(SentMessage {
                    message_id: "sent-1".into(),
                    channel_id,
                })
            })
        }

        fn add_reaction(
            &self,
            _channel_id: &str,
            message_id: &str,
            glyph: &str,
        ) -> TransportFuture<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("react:{message_id}:{glyph}"));
            Box::pin(async { Ok(()) })
        }
    }

    fn setup() -> (tempfile::TempDir, Dispatcher, Arc<Storage>, LootCommand) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::open(&dir.path().join("test.db")).unwrap());
        run_migrations(&storage).unwrap();

        let dispatcher = Dispatcher::new();
        let command =
            LootCommand::new(&dispatcher, Arc::clone(&storage), dir.path()).unwrap();
        fs::write(dir.path().join("loot/pearl.png"), PNG_MAGIC).unwrap();

        (dir, dispatcher, storage, command)
    }

    fn message() -> InboundMessage {
        InboundMessage {
            author_id: "user-1".into(),
            message_id: "m-1".into(),
            channel_id: "chan-1".into(),
            guild_id: "guild-1".into(),
            content: "nelu loot".into(),
        }
    }

    #[test]
    fn detect_mime_known_types() {
        assert_eq!(detect_mime(PNG_MAGIC), "image/png");
        assert_eq!(detect_mime(b"GIF89a..."), "image/gif");
        assert_eq!(detect_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(detect_mime(b"BM......"), "image/bmp");
        assert_eq!(detect_mime(b"RIFF....WEBPVP8 "), "image/webp");
        assert_eq!(detect_mime(b"plain text"), "application/octet-stream");
    }

    #[test]
    fn rarity_lookup() {
        assert_eq!(rarity("common").unwrap().color, 0xDEDEDE);
        assert_eq!(rarity("legendary").unwrap().name, "Legendary");
        assert!(rarity("mythic").is_none());
    }

    #[test]
    fn empty_loot_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = pick_random_file(dir.path());
        assert!(matches!(result, Err(AppError::Command(_))));
    }

    #[tokio::test]
    async fn run_posts_embed_and_records_rows() {
        let (_dir, _dispatcher, storage, command) = setup();
        let transport = Arc::new(FixedTransport::new());

        command
            .run(Arc::clone(&transport) as Arc<dyn ChatTransport>, &message())
            .await
            .unwrap();

        let calls = transport.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "embed:image/png".to_string(),
                format!("react:sent-1:{LIKE_GLYPH}"),
                format!("react:sent-1:{DISLIKE_GLYPH}"),
            ]
        );
        assert_eq!(storage.likes("sent-1").unwrap(), 0);
    }

    #[tokio::test]
    async fn reactions_move_the_like_counter() {
        let (_dir, dispatcher, storage, command) = setup();
        let transport = Arc::new(FixedTransport::new());
        command
            .run(Arc::clone(&transport) as Arc<dyn ChatTransport>, &message())
            .await
            .unwrap();

        let like = |glyph: &str| -> crate::event::EventPayload {
            Arc::new(ReactionEvent {
                glyph_hash: crate::gateway::glyph_digest(glyph),
                glyph: glyph.into(),
                user_id: "user-2".into(),
                message_id: "sent-1".into(),
                channel_id: "chan-1".into(),
                guild_id: "guild-1".into(),
            })
        };

        dispatcher.emit_and_wait(REACTION_ADDED, like(LIKE_GLYPH)).await;
        assert_eq!(storage.likes("sent-1").unwrap(), 1);

        // Dislikes and unrelated glyphs leave the counter alone.
        dispatcher.emit_and_wait(REACTION_ADDED, like(DISLIKE_GLYPH)).await;
        dispatcher.emit_and_wait(REACTION_ADDED, like("🦀")).await;
        assert_eq!(storage.likes("sent-1").unwrap(), 1);

        dispatcher.emit_and_wait(REACTION_REMOVED, like(LIKE_GLYPH)).await;
        assert_eq!(storage.likes("sent-1").unwrap(), 0);
    }

    #[tokio::test]
    async fn drop_unregisters_handlers() {
        let (_dir, dispatcher, _storage, command) = setup();
        assert_eq!(dispatcher.handler_count(REACTION_ADDED), 1);
        assert_eq!(dispatcher.handler_count(REACTION_REMOVED), 1);

        drop(command);
        assert_eq!(dispatcher.handler_count(REACTION_ADDED), 0);
        assert_eq!(dispatcher.handler_count(REACTION_REMOVED), 0);
    }
}
