//! Reaction topics and payload shape.
//!
//! Topic names are an opaque convention between the gateway adapter (which
//! emits) and commands (which subscribe); the dispatcher enforces no
//! enumeration.

/// A reaction was added to a message.
pub const REACTION_ADDED: &str = "reaction/added";

/// A reaction was removed from a message.
pub const REACTION_REMOVED: &str = "reaction/removed";

/// Payload published on [`REACTION_ADDED`] / [`REACTION_REMOVED`].
///
/// Carries the platform event's identifying fields; consumers downcast the
/// emission payload to this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    /// Hex-encoded SHA-256 digest of the glyph name — a stable identifier
    /// independent of how the platform encodes the glyph itself.
    pub glyph_hash: String,
    /// The reaction glyph as received (e.g. `"👍"`).
    pub glyph: String,
    /// User who added or removed the reaction.
    pub user_id: String,
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: String,
}
