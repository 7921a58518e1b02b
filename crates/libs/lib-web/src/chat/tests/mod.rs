//! # Chat Pipeline Tests
//!
//! Pipeline behaviour against a real in-memory SQLite store, with scripted
//! completion services and a store wrapper that can be told to fail.

mod send;

use super::*;
use async_trait::async_trait;
use lib_core::dto::{Author, ChatTurn, Message};
use lib_core::model::store::run_migrations;
use lib_core::{AppError, ChatStore, Result, SqliteChatStore};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// In-memory SQLite store with migrations applied.
pub async fn setup_store() -> Arc<SqliteChatStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Arc::new(SqliteChatStore::new(pool))
}

/// Store wrapper with switchable failures.
pub struct FlakyStore {
    inner: Arc<SqliteChatStore>,
    /// Inserts allowed before every further insert fails
    inserts_left: AtomicUsize,
    fail_counter: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyStore {
    pub async fn new() -> Self {
        Self {
            inner: setup_store().await,
            inserts_left: AtomicUsize::new(usize::MAX),
            fail_counter: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn allow_inserts(&self, n: usize) {
        self.inserts_left.store(n, Ordering::SeqCst);
    }

    pub fn fail_counter(&self) {
        self.fail_counter.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    fn unavailable() -> AppError {
        AppError::StorageUnavailable("injected failure".to_string())
    }
}

#[async_trait]
impl ChatStore for FlakyStore {
    async fn insert_message(&self, message: &Message) -> Result<()> {
        let allowed = self
            .inserts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(Self::unavailable());
        }
        self.inner.insert_message(message).await
    }

    async fn recent_messages(&self, limit: i64) -> Result<Vec<Message>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.recent_messages(limit).await
    }

    async fn count_messages(&self) -> Result<i64> {
        self.inner.count_messages().await
    }

    async fn delete_all_messages(&self) -> Result<u64> {
        self.inner.delete_all_messages().await
    }

    async fn increment_counter(&self, key: &str) -> Result<i64> {
        if self.fail_counter.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.increment_counter(key).await
    }
}

/// Completion service returning a fixed reply and recording every prompt.
#[derive(Default)]
pub struct ScriptedCompletion {
    reply: String,
    calls: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedCompletion {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, turns: &[ChatTurn]) -> std::result::Result<String, CompletionError> {
        self.calls.lock().unwrap().push(turns.to_vec());
        Ok(self.reply.clone())
    }
}

/// Completion service that always fails with the error built by `make`.
pub struct FailingCompletion {
    make: fn() -> CompletionError,
}

impl FailingCompletion {
    pub fn new(make: fn() -> CompletionError) -> Arc<Self> {
        Arc::new(Self { make })
    }
}

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _turns: &[ChatTurn]) -> std::result::Result<String, CompletionError> {
        Err((self.make)())
    }
}

pub fn pipeline(
    store: Arc<dyn ChatStore>,
    completion: Arc<dyn CompletionService>,
) -> ConversationPipeline {
    ConversationPipeline::new(store, completion, PipelineSettings::default())
}

/// Open a session and return it with the receiving end of its outbound queue.
pub async fn connect(
    pipeline: &ConversationPipeline,
    connection_id: &str,
) -> (Session, mpsc::UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = pipeline.open_session(connection_id, tx).await.unwrap();
    (session, rx)
}

/// Everything queued so far for one connection.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Texts of the `receiveMessage` events among `events`.
pub fn received_texts(events: &[ServerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::ReceiveMessage(message) => Some(message.text.clone()),
            _ => None,
        })
        .collect()
}

pub fn send(text: &str, name: &str) -> SendMessage {
    SendMessage {
        text: text.to_string(),
        user: Author::new(format!("id-{}", name), name),
    }
}
