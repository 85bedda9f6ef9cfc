//! Loot repository — images, messages, like counters.

use tracing::warn;

use super::Storage;
use super::migrate::now_iso8601;
use crate::error::AppError;

impl Storage {
    /// Record a dropped loot image; returns its row id.
    pub fn save_loot_image(
        &self,
        name: &str,
        mime_type: &str,
        hash: &str,
    ) -> Result<i64, AppError> {
        let now = now_iso8601();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO loot_image (name, mime_type, hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (name, mime_type, hash, &now, &now),
        )
        .map_err(|e| {
            warn!("error inserting loot image: {e}");
            AppError::Storage(format!("insert loot image: {e}"))
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Record the chat message a loot image was posted as; returns its row id.
    pub fn save_loot_message(
        &self,
        message_id: &str,
        channel_id: &str,
        guild_id: &str,
        image_id: i64,
    ) -> Result<i64, AppError> {
        let now = now_iso8601();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO loot_message (message_id, channel_id, guild_id, image_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (message_id, channel_id, guild_id, image_id, &now, &now),
        )
        .map_err(|e| {
            warn!("error inserting loot message: {e}");
            AppError::Storage(format!("insert loot message: {e}"))
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Increment the like counter of a loot message.
    ///
    /// Unknown message ids update zero rows and are not an error — reactions
    /// can arrive for messages this bot never posted.
    pub fn add_like(&self, message_id: &str) -> Result<(), AppError> {
        self.conn()
            .execute(
                "UPDATE loot_message
                 SET likes = likes + 1, updated_at = ?2
                 WHERE message_id = ?1",
                (message_id, now_iso8601()),
            )
            .map_err(|e| AppError::Storage(format!("add like: {e}")))?;
        Ok(())
    }

    /// Decrement the like counter of a loot message, floored at zero.
    pub fn remove_like(&self, message_id: &str) -> Result<(), AppError> {
        self.conn()
            .execute(
                "UPDATE loot_message
                 SET likes = MAX(likes - 1, 0), updated_at = ?2
                 WHERE message_id = ?1",
                (message_id, now_iso8601()),
            )
            .map_err(|e| AppError::Storage(format!("remove like: {e}")))?;
        Ok(())
    }

    /// Current like count of a loot message.
    pub fn likes(&self, message_id: &str) -> Result<i64, AppError> {
        self.conn()
            .query_row(
                "SELECT likes FROM loot_message WHERE message_id = ?1",
                [message_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Storage(format!("read likes: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Storage, run_migrations};

    fn open_migrated() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("test.db")).unwrap();
        run_migrations(&storage).unwrap();
        (dir, storage)
    }

    fn seed_message(storage: &Storage, message_id: &str) {
        let image_id = storage
            .save_loot_image("pearl.png", "image/png", "abc123")
            .unwrap();
        storage
            .save_loot_message(message_id, "chan-1", "guild-1", image_id)
            .unwrap();
    }

    #[test]
    fn save_and_count_likes() {
        let (_dir, storage) = open_migrated();
        seed_message(&storage, "msg-1");

        assert_eq!(storage.likes("msg-1").unwrap(), 0);

        storage.add_like("msg-1").unwrap();
        storage.add_like("msg-1").unwrap();
        assert_eq!(storage.likes("msg-1").unwrap(), 2);

        storage.remove_like("msg-1").unwrap();
        assert_eq!(storage.likes("msg-1").unwrap(), 1);
    }

    #[test]
    fn remove_like_floors_at_zero() {
        let (_dir, storage) = open_migrated();
        seed_message(&storage, "msg-1");

        storage.remove_like("msg-1").unwrap();
        assert_eq!(storage.likes("msg-1").unwrap(), 0);
    }

    #[test]
    fn likes_on_unknown_message_is_harmless() {
        let (_dir, storage) = open_migrated();
        // Update paths tolerate unknown ids; the read path reports them.
        storage.add_like("never-posted").unwrap();
        assert!(storage.likes("never-posted").is_err());
    }

    #[test]
    fn duplicate_message_id_rejected() {
        let (_dir, storage) = open_migrated();
        seed_message(&storage, "msg-1");

        let image_id = storage
            .save_loot_image("kelp.gif", "image/gif", "def456")
            .unwrap();
        let result = storage.save_loot_message("msg-1", "chan-2", "guild-1", image_id);
        assert!(result.is_err());
    }
}
