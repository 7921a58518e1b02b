//! # Chat Data Transfer Objects
//!
//! Messages, authors, connection identities and conversation turns.
//!
//! Field names on the wire follow the browser client's expectations
//! (`_id`, `user`, `createdAt`), so serde renames are applied here rather than
//! in the websocket layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Maximum stored length of a message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 9000;

/// Author id stamped on every AI-generated message.
pub const AI_AUTHOR_ID: &str = "ai-bot";

/// Display name stamped on every AI-generated message.
pub const AI_AUTHOR_NAME: &str = "AI Agent";

/// Counter key used to number connections.
pub const USER_COUNTER_KEY: &str = "userCount";

/// Author snapshot copied into a message at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The fixed synthetic author used for AI replies.
    pub fn ai() -> Self {
        Self::new(AI_AUTHOR_ID, AI_AUTHOR_NAME)
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    #[serde(rename = "user")]
    pub author: Author,
    #[serde(rename = "createdAt", serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn serialize_timestamp<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&lib_utils::format_time(*time))
}

impl Message {
    /// Create a new message with a fresh id, stamped with the current time.
    ///
    /// The text is truncated to [`MAX_MESSAGE_CHARS`].
    pub fn new(text: &str, author: Author) -> Self {
        Self::with_timestamp(text, author, lib_utils::now_utc())
    }

    /// Same as [`Message::new`] with an explicit creation time.
    pub fn with_timestamp(text: &str, author: Author, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: lib_utils::truncate_chars(text, MAX_MESSAGE_CHARS),
            author,
            created_at,
        }
    }

    pub fn is_from_ai(&self) -> bool {
        self.author.id == AI_AUTHOR_ID
    }
}

/// Display identity assigned to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub ordinal: i64,
    pub display_name: String,
}

impl Identity {
    /// Derive the identity for a counter value (`7` -> `user7`).
    pub fn from_ordinal(ordinal: i64) -> Self {
        Self {
            ordinal,
            display_name: format!("user{}", ordinal),
        }
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged entry of a session's conversation memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
