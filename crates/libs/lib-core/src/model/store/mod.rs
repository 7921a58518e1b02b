//! # Database Store
//!
//! Database connection pool, repositories and the [`ChatStore`] abstraction the
//! conversation pipeline persists through.

// region: --- Modules
pub mod chat_store;
pub mod counter_repository;
pub mod message_repository;
pub mod models;
// endregion: --- Modules

// region: --- Re-exports
pub use chat_store::{ChatStore, SqliteChatStore};
pub use counter_repository::CounterRepository;
pub use message_repository::MessageRepository;
// endregion: --- Re-exports

// region: --- Types and Functions
use sqlx::{SqlitePool, migrate::Migrator, sqlite::SqliteConnectOptions};

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new SQLite connection pool, creating the database file if missing.
pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    Ok(pool)
}

/// Migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../../migrations");

/// Apply pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
// endregion: --- Types and Functions
