//! # Data Transfer Objects (DTOs)
//!
//! Data structures shared between storage, the conversation pipeline and the
//! websocket protocol.

pub mod chat;

pub use chat::*;
