//! # HTTP Handlers
//!
//! Route handlers for the chat server.
//!
//! ## Modules
//!
//! - **[`chat`]**: Message log administration (`POST /delete-chat`)
//! - **[`websocket`]**: The chat socket (`GET /ws`)

// region: --- Modules
pub mod chat;
pub mod websocket;
// endregion: --- Modules

#[cfg(test)]
mod tests;
