//! # Web Library
//!
//! The chat server: websocket and HTTP handlers, the conversation pipeline,
//! middleware and server startup.

pub mod chat;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{create_router, start_server, AppState, ServerConfig};
