//! Read models served from the stats store.
//!
//! These are the results of the expensive per-year queries that sit behind
//! the memoizing cache. They are plain data; presentation concerns such as
//! avatar or attachment URLs are added by the API layer.

use crate::{UserId, Year};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One emoji a user used, inline or as a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEmojiEntry {
    pub emoji_id: String,
    pub native: bool,
    pub animated: bool,
    pub inline: u64,
    pub reactions: u64,
}

impl UserEmojiEntry {
    /// Combined usage used for ranking favourites.
    pub fn usage(&self) -> u64 {
        self.inline + self.reactions
    }
}

/// Shape of one value in the persisted `emoji_data` column.
#[derive(Debug, Deserialize)]
struct EmojiUsage {
    native: bool,
    animated: bool,
    inline: u64,
    reactions: u64,
}

/// Parse the per-user emoji payload into favourites, most used first.
///
/// A missing payload means no favourites. Ties keep emoji id order.
pub fn favourite_emojis(raw: Option<&str>) -> Result<Vec<UserEmojiEntry>, serde_json::Error> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let parsed: BTreeMap<String, EmojiUsage> = serde_json::from_str(raw)?;
    let mut favourites: Vec<UserEmojiEntry> = parsed
        .into_iter()
        .map(|(emoji_id, usage)| UserEmojiEntry {
            emoji_id,
            native: usage.native,
            animated: usage.animated,
            inline: usage.inline,
            reactions: usage.reactions,
        })
        .collect();
    favourites.sort_by(|a, b| b.usage().cmp(&a.usage()));
    Ok(favourites)
}

/// Per-user yearly statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: UserId,
    pub year: Year,
    pub user_nickname: String,
    pub mentions_received: u64,
    pub mentions_given: u64,
    pub reactions_received: u64,
    pub reactions_given: u64,
    pub messages_sent: u64,
    pub attachments_sent: u64,
    pub attachments_size: u64,
    /// Hour of day (0-23) the user posted most.
    pub most_frequent_time: u32,
    pub most_mentioned_given_name: Option<String>,
    pub most_mentioned_received_name: Option<String>,
    pub most_mentioned_given_count: u64,
    pub most_mentioned_received_count: u64,
    pub favourite_emojis: Vec<UserEmojiEntry>,
}

/// Community-wide totals for a year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_mentions: u64,
    pub total_reactions: u64,
    pub total_messages: u64,
    pub total_attachments: u64,
    pub total_attachments_size: u64,
}

/// A liked attachment on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedAttachment {
    pub rank: u64,
    pub attachment_id: i64,
    pub file_name: String,
    pub sender_handle: Option<String>,
    pub related_message_content: Option<String>,
    pub related_channel_name: Option<String>,
    pub likes: u64,
}

/// A liked message on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMessage {
    pub rank: u64,
    pub message_id: i64,
    pub content: String,
    pub sender_handle: String,
    pub channel_name: String,
    pub likes: u64,
}

/// Most-liked attachments and messages of a year, rank ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub attachments: Vec<RankedAttachment>,
    pub messages: Vec<RankedMessage>,
}

/// A user's most-reacted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotableContent {
    Message {
        message_id: i64,
        content: String,
        sender_handle: String,
        channel_name: String,
        total_reactions: u64,
    },
    Attachment {
        attachment_id: i64,
        file_name: String,
        sender_handle: String,
        related_message_content: String,
        related_channel_name: String,
        total_reactions: u64,
    },
}

impl NotableContent {
    pub fn total_reactions(&self) -> u64 {
        match self {
            NotableContent::Message { total_reactions, .. }
            | NotableContent::Attachment { total_reactions, .. } => *total_reactions,
        }
    }
}

/// An attachment a user liked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedAttachment {
    pub attachment_id: i64,
    pub file_name: String,
    pub sender_handle: Option<String>,
    pub related_message_content: Option<String>,
    pub related_channel_name: Option<String>,
}

/// A message a user liked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedMessage {
    pub message_id: i64,
    pub content: String,
    pub sender_handle: String,
    pub channel_name: String,
}

/// Everything one user liked in a year, most recent like first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLikes {
    pub attachments: Vec<LikedAttachment>,
    pub messages: Vec<LikedMessage>,
}

/// Who mentioned whom most.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionGraphEdge {
    pub from_user: String,
    pub to_user: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionGraph {
    pub edges: Vec<MentionGraphEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favourite_emojis_sorted_by_usage() {
        let raw = r#"{
            "111": {"native": false, "animated": true, "inline": 1, "reactions": 2},
            "🔥": {"native": true, "animated": false, "inline": 10, "reactions": 5},
            "222": {"native": false, "animated": false, "inline": 0, "reactions": 7}
        }"#;

        let favourites = favourite_emojis(Some(raw)).unwrap();
        let ids: Vec<&str> = favourites.iter().map(|e| e.emoji_id.as_str()).collect();
        assert_eq!(ids, vec!["🔥", "222", "111"]);
        assert!(favourites[0].native);
        assert_eq!(favourites[0].usage(), 15);
    }

    #[test]
    fn test_favourite_emojis_missing_payload() {
        assert!(favourite_emojis(None).unwrap().is_empty());
    }

    #[test]
    fn test_favourite_emojis_rejects_garbage() {
        assert!(favourite_emojis(Some("[1,2]")).is_err());
    }

    #[test]
    fn test_notable_content_serializes_with_kind_tag() {
        let item = NotableContent::Message {
            message_id: 7,
            content: "gg".to_string(),
            sender_handle: "ana".to_string(),
            channel_name: "general".to_string(),
            total_reactions: 12,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(item.total_reactions(), 12);
    }
}
