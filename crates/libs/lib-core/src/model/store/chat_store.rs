//! # Chat Store
//!
//! The durable store seen by the conversation pipeline: an append-only message log
//! plus atomic named counters. [`SqliteChatStore`] is the production implementation;
//! tests substitute their own implementations to inject storage failures.

use async_trait::async_trait;

use super::{CounterRepository, DbPool, MessageRepository};
use crate::dto::Message;
use crate::error::Result;

/// Durable message log and counter store.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Append a message. The message must not be broadcast unless this succeeds.
    async fn insert_message(&self, message: &Message) -> Result<()>;

    /// Most recent `limit` messages, oldest first.
    async fn recent_messages(&self, limit: i64) -> Result<Vec<Message>>;

    /// Number of stored messages.
    async fn count_messages(&self) -> Result<i64>;

    /// Delete every message, returning how many were removed.
    async fn delete_all_messages(&self) -> Result<u64>;

    /// Atomically increment the named counter and return the new value.
    async fn increment_counter(&self, key: &str) -> Result<i64>;
}

/// [`ChatStore`] backed by SQLite through the repositories.
#[derive(Clone)]
pub struct SqliteChatStore {
    pool: DbPool,
}

impl SqliteChatStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn insert_message(&self, message: &Message) -> Result<()> {
        MessageRepository::insert(&self.pool, message).await?;
        Ok(())
    }

    async fn recent_messages(&self, limit: i64) -> Result<Vec<Message>> {
        Ok(MessageRepository::recent(&self.pool, limit).await?)
    }

    async fn count_messages(&self) -> Result<i64> {
        Ok(MessageRepository::count(&self.pool).await?)
    }

    async fn delete_all_messages(&self) -> Result<u64> {
        Ok(MessageRepository::delete_all(&self.pool).await?)
    }

    async fn increment_counter(&self, key: &str) -> Result<i64> {
        Ok(CounterRepository::increment(&self.pool, key).await?)
    }
}
