//! # Chat Wire Events
//!
//! Every websocket text frame is a JSON object `{"event": <name>, "data": <payload>}`.
//!
//! ## Server → client
//!
//! | event            | data                                   | audience        |
//! |------------------|----------------------------------------|-----------------|
//! | `assignUsername` | `{"name": "user7"}`                    | the connection  |
//! | `chatHistory`    | `[Message, ...]` (oldest first)        | the connection  |
//! | `receiveMessage` | `Message`                              | every listener  |
//! | `aiTyping`       | `{"status": bool, "name": "AI Agent"}` | the sender      |
//! | `clearChat`      | none                                   | the requester   |
//! | `sendError`      | `{"message": "..."}`                   | the sender      |
//! | `connectError`   | `{"message": "..."}`                   | the connection  |
//!
//! ## Client → server
//!
//! | event         | data                                             |
//! |---------------|--------------------------------------------------|
//! | `sendMessage` | `{"text": "...", "user": {"_id": "...", "name": "..."}}` |
//! | `newChat`     | none                                             |

use lib_core::dto::{Author, Message};
use lib_core::{AppError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Event pushed from the server to one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    AssignUsername { name: String },
    ChatHistory(Vec<Message>),
    ReceiveMessage(Message),
    AiTyping { status: bool, name: String },
    ClearChat,
    SendError { message: String },
    ConnectError { message: String },
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::AssignUsername { .. } => "assignUsername",
            ServerEvent::ChatHistory(_) => "chatHistory",
            ServerEvent::ReceiveMessage(_) => "receiveMessage",
            ServerEvent::AiTyping { .. } => "aiTyping",
            ServerEvent::ClearChat => "clearChat",
            ServerEvent::SendError { .. } => "sendError",
            ServerEvent::ConnectError { .. } => "connectError",
        }
    }

    /// Serialize into a websocket text frame.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Event sent by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    SendMessage(SendMessage),
    NewChat,
}

impl ClientEvent {
    /// Parse a websocket text frame.
    pub fn parse(frame: &str) -> Result<Self> {
        serde_json::from_str(frame)
            .map_err(|e| AppError::InvalidInput(format!("Malformed chat event: {}", e)))
    }
}

/// Payload of a `sendMessage` event.
///
/// The author is taken as claimed by the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendMessage {
    #[serde(default, deserialize_with = "text_from_scalar")]
    pub text: String,
    pub user: Author,
}

impl SendMessage {
    /// Check the fields every stored message must carry.
    ///
    /// Text and both author fields must be non-empty. Whitespace counts as content.
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(AppError::InvalidInput("Message text is required".to_string()));
        }
        if self.user.id.is_empty() || self.user.name.is_empty() {
            return Err(AppError::InvalidInput("Message author is required".to_string()));
        }
        Ok(())
    }
}

/// Accept any JSON scalar as message text. Numbers and booleans are kept in
/// their JSON spelling, `null` becomes the empty string.
fn text_from_scalar<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
