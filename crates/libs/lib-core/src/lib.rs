//! # Core Library
//!
//! Core models, storage, configuration and errors for the chat relay.

pub mod config;
pub mod error;
pub mod model;
pub mod dto;

// Re-export commonly used types
pub use config::{AiBackend, Config};
pub use error::{AppError, Result};
pub use model::store::{ChatStore, DbPool, SqliteChatStore, create_pool};
