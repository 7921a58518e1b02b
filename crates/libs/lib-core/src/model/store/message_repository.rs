//! # Message Repository
//!
//! Database access layer for the append-only chat log.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use lib_core::model::store::{MessageRepository, create_pool};
//! # use lib_core::dto::{Author, Message};
//! # async fn example() -> anyhow::Result<()> {
//! let pool = create_pool("sqlite::memory:").await?;
//!
//! let message = Message::new("hello", Author::new("u1", "user1"));
//! MessageRepository::insert(&pool, &message).await?;
//!
//! // Oldest first
//! let history = MessageRepository::recent(&pool, 20).await?;
//! # Ok(())
//! # }
//! ```

use super::models::MessageRow;
use super::DbPool;
use crate::dto::Message;
use sqlx::query_as;

/// Message repository for database operations.
pub struct MessageRepository;

impl MessageRepository {
    /// Append a message to the log.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Message stored
    /// * `Err(sqlx::Error)` - Database error (including a duplicate id)
    pub async fn insert(pool: &DbPool, message: &Message) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, text, author_id, author_name, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.text)
        .bind(&message.author.id)
        .bind(&message.author.name)
        .bind(message.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Fetch the most recent `limit` messages in chronological order (oldest first).
    ///
    /// Rows are selected newest-first so the limit keeps the latest messages, then
    /// reversed. Messages sharing a timestamp keep insertion order.
    pub async fn recent(pool: &DbPool, limit: i64) -> Result<Vec<Message>, sqlx::Error> {
        let rows = query_as::<_, MessageRow>(
            r#"
            SELECT id, text, author_id, author_name, created_at
            FROM messages
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().rev().map(Message::from).collect())
    }

    /// Count stored messages.
    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(pool)
            .await
    }

    /// Delete every message.
    ///
    /// # Returns
    ///
    /// Number of messages deleted.
    pub async fn delete_all(pool: &DbPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM messages").execute(pool).await?;
        Ok(result.rows_affected())
    }
}
