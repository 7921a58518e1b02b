//! # Handler Tests
//!
//! HTTP routes through the full router, and the chat socket against a real listener.

mod routes;

use crate::chat::{CompletionError, CompletionService, ConversationPipeline, PipelineSettings};
use crate::server::{create_router, AppState};
use async_trait::async_trait;
use axum::Router;
use lib_core::dto::ChatTurn;
use lib_core::model::store::run_migrations;
use lib_core::{ChatStore, Config, SqliteChatStore};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

/// Completion service that echoes the latest user turn.
pub struct EchoCompletion;

#[async_trait]
impl CompletionService for EchoCompletion {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        let last = turns.last().map(|turn| turn.content.as_str()).unwrap_or_default();
        Ok(format!("echo: {}", last))
    }
}

/// In-memory store with migrations applied.
pub async fn setup_store() -> Arc<SqliteChatStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Arc::new(SqliteChatStore::new(pool))
}

/// Application state around `store`, serving static files from `static_dir`.
pub fn test_state(store: Arc<dyn ChatStore>, static_dir: &str) -> AppState {
    let config = Config {
        static_dir: static_dir.to_string(),
        ..Config::default()
    };
    let pipeline = Arc::new(ConversationPipeline::new(
        store,
        Arc::new(EchoCompletion),
        PipelineSettings::from(&config),
    ));

    AppState {
        config,
        pipeline,
    }
}

/// Create test app with all routes.
pub fn test_app(state: AppState) -> Router {
    create_router(state, &[])
}
