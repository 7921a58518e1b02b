//! # Counter Repository
//!
//! Named monotonic counters backed by the `counters` table.
//!
//! The increment is a single `INSERT ... ON CONFLICT DO UPDATE ... RETURNING`
//! statement, so SQLite applies it atomically no matter how many connections
//! race on the same key. Values survive restarts because they live in the
//! database, not in process memory.

use super::DbPool;

/// Counter repository for database operations.
pub struct CounterRepository;

impl CounterRepository {
    /// Atomically increment `key` and return the new value.
    ///
    /// A missing counter is created with value `1`.
    pub async fn increment(pool: &DbPool, key: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO counters (key, value)
            VALUES (?, 1)
            ON CONFLICT (key) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(key)
        .fetch_one(pool)
        .await
    }
}
