use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::dto::{Author, Message};

/// Message row as stored in the `messages` table.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            text: row.text,
            author: Author {
                id: row.author_id,
                name: row.author_name,
            },
            created_at: row.created_at,
        }
    }
}
