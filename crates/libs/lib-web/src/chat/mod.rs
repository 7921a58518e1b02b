//! # Chat Module
//!
//! Real-time group chat with an AI participant.
//!
//! Clients connect over a websocket, get a `user<N>` identity and recent
//! history, and from then on receive every message anyone posts. Each human
//! message gets a reply from the completion service, generated from that
//! connection's private conversation memory and broadcast to everyone.

pub mod completion;
pub mod events;
pub mod hub;
pub mod identity;
pub mod pipeline;
pub mod session;
#[cfg(feature = "genai")]
pub mod ai_bot;

pub use completion::{CompletionError, CompletionService, OpenRouterClient};
pub use events::{ClientEvent, SendMessage, ServerEvent};
pub use hub::BroadcastHub;
pub use identity::IdentityAssigner;
pub use pipeline::{ConversationPipeline, PipelineSettings, SendOutcome};
pub use session::{ConversationMemory, Session, SessionState};
#[cfg(feature = "genai")]
pub use ai_bot::GenAiCompletion;

#[cfg(test)]
mod tests;
