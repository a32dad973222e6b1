//! Source-data rows and the writes that load them.
//!
//! The export that fills `messages`, `users` and `attachments` lives outside
//! this crate; these inserts exist so fixtures and small tools can build a
//! database in the same shape. Likes are written by the serving side.

use recap_core::{LikedAttachment, LikedMessage, RecapResult, UserId, UserLikes, Year};
use rusqlite::params;

use super::{count, query_failed, SqliteStore};

/// One row of `messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRow {
    pub message_id: i64,
    pub year: Year,
    pub timestamp: i64,
    pub author_id: i64,
    pub author_name: String,
    pub channel_id: i64,
    pub channel_name: String,
    pub content: String,
    /// Kept signed so bad exports can be loaded and rejected on read.
    pub total_reactions: i64,
    /// JSON array of mentioned users.
    pub mentions: String,
}

/// One row of `users`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: i64,
    pub year: Year,
    pub user_name: String,
    pub user_nickname: String,
    pub mentions_received: i64,
    pub mentions_given: i64,
    pub reactions_received: i64,
    pub reactions_given: i64,
    pub messages_sent: i64,
    pub attachments_sent: i64,
    pub attachments_size: i64,
    pub most_frequent_time: i64,
    pub most_mentioned_given_name: Option<String>,
    pub most_mentioned_received_name: Option<String>,
    pub most_mentioned_given_count: i64,
    pub most_mentioned_received_count: i64,
    /// JSON object keyed by emoji id.
    pub emoji_data: Option<String>,
}

/// One row of `attachments`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentRow {
    pub id: i64,
    pub year: Year,
    pub file_name: String,
    pub extension: String,
    pub timestamp: i64,
    pub related_message_id: Option<i64>,
}

impl SqliteStore {
    pub fn insert_message(&self, row: &MessageRow) -> RecapResult<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO messages (message_id, year, timestamp, author_id, author_name, \
                 channel_id, channel_name, content, content_length, total_reactions, mentions) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    row.message_id,
                    row.year,
                    row.timestamp,
                    row.author_id,
                    row.author_name,
                    row.channel_id,
                    row.channel_name,
                    row.content,
                    row.content.chars().count() as i64,
                    row.total_reactions,
                    row.mentions,
                ],
            )
            .map_err(query_failed("insert_message"))?;
        Ok(())
    }

    pub fn insert_user(&self, row: &UserRow) -> RecapResult<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO users (user_id, year, user_name, user_nickname, \
                 mentions_received, mentions_given, reactions_received, reactions_given, \
                 messages_sent, attachments_sent, attachments_size, most_frequent_time, \
                 most_mentioned_given_name, most_mentioned_received_name, \
                 most_mentioned_given_count, most_mentioned_received_count, emoji_data) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    row.user_id,
                    row.year,
                    row.user_name,
                    row.user_nickname,
                    row.mentions_received,
                    row.mentions_given,
                    row.reactions_received,
                    row.reactions_given,
                    row.messages_sent,
                    row.attachments_sent,
                    row.attachments_size,
                    row.most_frequent_time,
                    row.most_mentioned_given_name,
                    row.most_mentioned_received_name,
                    row.most_mentioned_given_count,
                    row.most_mentioned_received_count,
                    row.emoji_data,
                ],
            )
            .map_err(query_failed("insert_user"))?;
        Ok(())
    }

    pub fn insert_attachment(&self, row: &AttachmentRow) -> RecapResult<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO attachments (id, year, file_name, extension, timestamp, \
                 related_message_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.id,
                    row.year,
                    row.file_name,
                    row.extension,
                    row.timestamp,
                    row.related_message_id,
                ],
            )
            .map_err(query_failed("insert_attachment"))?;
        Ok(())
    }

    /// Record a like. Liking twice is a no-op.
    pub fn like(&self, entity_id: i64, user: UserId, is_attachment: bool, at: i64) -> RecapResult<()> {
        let sql = if is_attachment {
            "INSERT INTO likes (attachment_id, discord_id, timestamp) VALUES (?1, ?2, ?3) \
             ON CONFLICT (attachment_id, discord_id) DO NOTHING"
        } else {
            "INSERT INTO message_likes (message_id, discord_id, timestamp) VALUES (?1, ?2, ?3) \
             ON CONFLICT (message_id, discord_id) DO NOTHING"
        };
        self.conn()?
            .execute(sql, params![entity_id, user.as_i64(), at])
            .map_err(query_failed("like"))?;
        Ok(())
    }

    /// Remove a like. Returns whether one existed.
    pub fn unlike(&self, entity_id: i64, user: UserId, is_attachment: bool) -> RecapResult<bool> {
        let sql = if is_attachment {
            "DELETE FROM likes WHERE attachment_id = ?1 AND discord_id = ?2"
        } else {
            "DELETE FROM message_likes WHERE message_id = ?1 AND discord_id = ?2"
        };
        let removed = self
            .conn()?
            .execute(sql, params![entity_id, user.as_i64()])
            .map_err(query_failed("unlike"))?;
        Ok(removed > 0)
    }

    /// Number of likes on one message or attachment.
    pub fn like_count(&self, entity_id: i64, is_attachment: bool) -> RecapResult<u64> {
        let sql = if is_attachment {
            "SELECT COUNT(*) FROM likes WHERE attachment_id = ?1"
        } else {
            "SELECT COUNT(*) FROM message_likes WHERE message_id = ?1"
        };
        self.conn()?
            .query_row(sql, params![entity_id], |row| count(row, 0))
            .map_err(query_failed("like_count"))
    }

    /// What `user` liked in `year`, most recent like first.
    pub fn likes_for_user(&self, year: Year, user: UserId) -> RecapResult<UserLikes> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT likes.attachment_id, attachments.file_name, messages.author_name, \
                 messages.content, messages.channel_name \
                 FROM likes JOIN attachments ON likes.attachment_id = attachments.id \
                 LEFT JOIN messages ON attachments.related_message_id = messages.message_id \
                 WHERE likes.discord_id = ?1 AND attachments.year = ?2 \
                 ORDER BY likes.timestamp DESC, likes.attachment_id ASC",
            )
            .map_err(query_failed("likes_for_user attachments"))?;
        let attachments = stmt
            .query_map(params![user.as_i64(), year], |row| {
                Ok(LikedAttachment {
                    attachment_id: row.get(0)?,
                    file_name: row.get(1)?,
                    sender_handle: row.get(2)?,
                    related_message_content: row.get(3)?,
                    related_channel_name: row.get(4)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(query_failed("likes_for_user attachments"))?;

        let mut stmt = conn
            .prepare(
                "SELECT messages.message_id, messages.content, messages.author_name, \
                 messages.channel_name \
                 FROM message_likes JOIN messages ON message_likes.message_id = messages.message_id \
                 WHERE message_likes.discord_id = ?1 AND messages.year = ?2 \
                 ORDER BY message_likes.timestamp DESC, messages.message_id ASC",
            )
            .map_err(query_failed("likes_for_user messages"))?;
        let messages = stmt
            .query_map(params![user.as_i64(), year], |row| {
                Ok(LikedMessage {
                    message_id: row.get(0)?,
                    content: row.get(1)?,
                    sender_handle: row.get(2)?,
                    channel_name: row.get(3)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(query_failed("likes_for_user messages"))?;

        Ok(UserLikes {
            attachments,
            messages,
        })
    }
}
