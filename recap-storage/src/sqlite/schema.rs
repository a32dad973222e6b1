//! Table layout of the stats database.

/// Idempotent DDL for every table the store reads or writes.
///
/// `static` and `word_usage` hold the aggregation output; the rest is the
/// exported source data.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    message_id      INTEGER PRIMARY KEY,
    year            INTEGER NOT NULL,
    timestamp       INTEGER NOT NULL,
    author_id       INTEGER NOT NULL,
    author_name     TEXT    NOT NULL,
    channel_id      INTEGER NOT NULL,
    channel_name    TEXT    NOT NULL,
    content         TEXT    NOT NULL DEFAULT '',
    content_length  INTEGER NOT NULL DEFAULT 0,
    total_reactions INTEGER NOT NULL DEFAULT 0,
    mentions        TEXT    NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS idx_messages_year_timestamp ON messages (year, timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_author ON messages (year, author_id);

CREATE TABLE IF NOT EXISTS users (
    user_id                       INTEGER NOT NULL,
    year                          INTEGER NOT NULL,
    user_name                     TEXT    NOT NULL,
    user_nickname                 TEXT    NOT NULL,
    mentions_received             INTEGER NOT NULL DEFAULT 0,
    mentions_given                INTEGER NOT NULL DEFAULT 0,
    reactions_received            INTEGER NOT NULL DEFAULT 0,
    reactions_given               INTEGER NOT NULL DEFAULT 0,
    messages_sent                 INTEGER NOT NULL DEFAULT 0,
    attachments_sent              INTEGER NOT NULL DEFAULT 0,
    attachments_size              INTEGER NOT NULL DEFAULT 0,
    most_frequent_time            INTEGER NOT NULL DEFAULT 0,
    most_mentioned_given_name     TEXT,
    most_mentioned_received_name  TEXT,
    most_mentioned_given_count    INTEGER NOT NULL DEFAULT 0,
    most_mentioned_received_count INTEGER NOT NULL DEFAULT 0,
    emoji_data                    TEXT,
    PRIMARY KEY (user_id, year)
);

CREATE TABLE IF NOT EXISTS attachments (
    id                 INTEGER PRIMARY KEY,
    year               INTEGER NOT NULL,
    file_name          TEXT    NOT NULL,
    extension          TEXT    NOT NULL DEFAULT '',
    timestamp          INTEGER NOT NULL,
    related_message_id INTEGER
);

CREATE TABLE IF NOT EXISTS likes (
    attachment_id INTEGER NOT NULL,
    discord_id    INTEGER NOT NULL,
    timestamp     INTEGER NOT NULL,
    PRIMARY KEY (attachment_id, discord_id)
);

CREATE TABLE IF NOT EXISTS message_likes (
    message_id INTEGER NOT NULL,
    discord_id INTEGER NOT NULL,
    timestamp  INTEGER NOT NULL,
    PRIMARY KEY (message_id, discord_id)
);

CREATE TABLE IF NOT EXISTS static (
    key   TEXT    NOT NULL,
    year  INTEGER NOT NULL,
    value TEXT    NOT NULL,
    PRIMARY KEY (key, year)
);

CREATE TABLE IF NOT EXISTS word_usage (
    word TEXT    NOT NULL,
    year INTEGER NOT NULL,
    data TEXT    NOT NULL,
    PRIMARY KEY (word, year)
);
"#;
