//! # Conversation Pipeline
//!
//! Everything that happens between a client event and the resulting broadcasts:
//!
//! 1. **Connect**: assign an identity, deliver it, deliver recent history, then
//!    register the connection as a broadcast listener.
//! 2. **sendMessage**: persist, broadcast, and unless the author looks like an
//!    AI, ask the completion service for a reply which is persisted and broadcast
//!    the same way. The sender alone sees the `aiTyping` bracket around the call.
//! 3. **newChat**: forget this connection's conversation memory.
//! 4. **Disconnect**: stop broadcasting to the connection and drop its memory.
//!
//! A message reaches clients only after it is in the store. Storage failures
//! are reported to the affected sender with a `sendError` event; completion
//! failures become a fallback reply and are never reported as errors.

use super::completion::CompletionService;
use super::events::{ClientEvent, SendMessage, ServerEvent};
use super::hub::BroadcastHub;
use super::identity::IdentityAssigner;
use super::session::{Outbound, Session};
use lib_core::dto::{Author, ChatTurn, Message, AI_AUTHOR_NAME};
use lib_core::{AppError, ChatStore, Config, Result};
use lib_utils::contains_ignore_case;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Case-insensitive substring of an author name that suppresses AI replies.
///
/// Any name containing it counts, so `Kaitlyn` or `Blaise` never get a reply.
pub const AI_AUTHOR_MARKER: &str = "ai";

/// Whether a message from `author` should be left unanswered by the AI participant.
pub fn is_ai_author(author: &Author) -> bool {
    contains_ignore_case(&author.name, AI_AUTHOR_MARKER)
}

/// Tunables for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Messages delivered to a new connection
    pub history_limit: i64,
    /// Cap on conversation memory per connection
    pub memory_limit: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            memory_limit: None,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            history_limit: config.history_limit,
            memory_limit: config.memory_limit,
        }
    }
}

/// Result of a successful `sendMessage`.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// The persisted and broadcast human message
    pub message: Message,
    /// The persisted and broadcast AI reply, if one was due
    pub reply: Option<Message>,
}

/// Shared chat service used by every connection.
pub struct ConversationPipeline {
    store: Arc<dyn ChatStore>,
    hub: Arc<BroadcastHub>,
    completion: Arc<dyn CompletionService>,
    identities: IdentityAssigner,
    settings: PipelineSettings,
}

impl ConversationPipeline {
    pub fn new(
        store: Arc<dyn ChatStore>,
        completion: Arc<dyn CompletionService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            identities: IdentityAssigner::new(Arc::clone(&store)),
            hub: Arc::new(BroadcastHub::new()),
            store,
            completion,
            settings,
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    // region: --- Connection lifecycle

    /// Bring a new connection to the active state.
    ///
    /// Queues `assignUsername` then `chatHistory` on `outbound`. The connection
    /// becomes a broadcast listener together with the `chatHistory` event, so
    /// every later broadcast follows the history.
    ///
    /// # Errors
    ///
    /// [`AppError::StorageUnavailable`] if the identity counter or the history
    /// cannot be read. The connection is not registered and should be closed.
    pub async fn open_session(
        &self,
        connection_id: impl Into<String>,
        outbound: Outbound,
    ) -> Result<Session> {
        let connection_id = connection_id.into();

        let identity = self.identities.assign().await.map_err(|e| {
            error!(connection_id = %connection_id, error = %e, "Identity assignment failed");
            e
        })?;

        let mut session = Session::new(
            connection_id,
            identity,
            self.settings.memory_limit,
            outbound,
        );
        session.emit(ServerEvent::AssignUsername {
            name: session.identity().display_name.clone(),
        });

        let history_len = self
            .hub
            .join(&session, self.store.recent_messages(self.settings.history_limit))
            .await
            .map_err(|e| {
                error!(
                    connection_id = %session.connection_id(),
                    error = %e,
                    "History fetch failed"
                );
                e
            })?;
        session.activate();

        info!(
            connection_id = %session.connection_id(),
            name = %session.identity().display_name,
            history = history_len,
            "Session active"
        );

        Ok(session)
    }

    /// Stop broadcasting to a connection. Its conversation memory goes with the session.
    pub async fn close_session(&self, session: &mut Session) {
        self.hub.unregister(session.connection_id()).await;
        session.close();
        info!(
            connection_id = %session.connection_id(),
            name = %session.identity().display_name,
            turns = session.memory().len(),
            "Session closed"
        );
    }

    // endregion: --- Connection lifecycle

    // region: --- Client events

    /// Parse and handle one text frame from the client.
    ///
    /// Malformed frames are answered with `sendError` and otherwise ignored.
    pub async fn handle_frame(&self, session: &mut Session, frame: &str) {
        match ClientEvent::parse(frame) {
            Ok(event) => self.handle_event(session, event).await,
            Err(e) => {
                warn!(
                    connection_id = %session.connection_id(),
                    error = %e,
                    "Rejected client frame"
                );
                session.emit(ServerEvent::SendError {
                    message: e.user_message(),
                });
            }
        }
    }

    pub async fn handle_event(&self, session: &mut Session, event: ClientEvent) {
        match event {
            ClientEvent::SendMessage(request) => {
                if let Err(e) = self.send_message(session, request).await {
                    debug!(
                        connection_id = %session.connection_id(),
                        error = %e,
                        "sendMessage did not complete"
                    );
                }
            }
            ClientEvent::NewChat => self.new_chat(session),
        }
    }

    /// Handle `sendMessage` for `session`.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] if the session is not active, or the text or
    ///   author is empty. In the latter case the sender has been sent `sendError`.
    /// - [`AppError::StorageUnavailable`] if the human message or the AI reply
    ///   could not be persisted. The sender has already been sent `sendError`.
    pub async fn send_message(
        &self,
        session: &mut Session,
        request: SendMessage,
    ) -> Result<SendOutcome> {
        if !session.is_alive() {
            return Err(AppError::InvalidInput("Session is not active".to_string()));
        }
        if let Err(e) = request.validate() {
            warn!(
                connection_id = %session.connection_id(),
                error = %e,
                "Rejected sendMessage"
            );
            session.emit(ServerEvent::SendError {
                message: e.user_message(),
            });
            return Err(e);
        }

        let SendMessage { text, user } = request;
        let message = Message::new(&text, user);
        self.persist(session, &message).await?;

        let delivered = self.hub.broadcast(&message).await;
        info!(
            connection_id = %session.connection_id(),
            message_id = %message.id,
            author = %message.author.name,
            delivered,
            "Message broadcast"
        );

        // Memory keeps the text as typed, before truncation
        session.memory_mut().push(ChatTurn::user(text));

        if is_ai_author(&message.author) {
            debug!(author = %message.author.name, "Skipping AI reply for AI-like author");
            return Ok(SendOutcome {
                message,
                reply: None,
            });
        }

        session.emit(ServerEvent::AiTyping {
            status: true,
            name: AI_AUTHOR_NAME.to_string(),
        });
        let reply_text = match self.completion.complete(session.memory().turns()).await {
            Ok(reply_text) => reply_text,
            Err(e) => {
                warn!(
                    connection_id = %session.connection_id(),
                    error = %e,
                    "Completion failed, posting fallback reply"
                );
                e.fallback_reply().to_string()
            }
        };
        session.emit(ServerEvent::AiTyping {
            status: false,
            name: AI_AUTHOR_NAME.to_string(),
        });

        let reply = Message::new(&reply_text, Author::ai());
        self.persist(session, &reply).await?;

        let delivered = self.hub.broadcast(&reply).await;
        session.memory_mut().push(ChatTurn::assistant(reply_text));
        info!(
            connection_id = %session.connection_id(),
            message_id = %reply.id,
            delivered,
            "AI reply broadcast"
        );

        Ok(SendOutcome {
            message,
            reply: Some(reply),
        })
    }

    /// Handle `newChat`: clear this connection's memory and confirm with `clearChat`.
    ///
    /// Stored messages and other connections are unaffected.
    pub fn new_chat(&self, session: &mut Session) {
        session.memory_mut().clear();
        session.emit(ServerEvent::ClearChat);
        info!(connection_id = %session.connection_id(), "Conversation memory cleared");
    }

    // endregion: --- Client events

    /// Delete every stored message. Connected clients are not notified and
    /// conversation memories are left as they are.
    pub async fn purge(&self) -> Result<u64> {
        let deleted = self.store.delete_all_messages().await?;
        info!(deleted, "Message log purged");
        Ok(deleted)
    }

    async fn persist(&self, session: &Session, message: &Message) -> Result<()> {
        if let Err(e) = self.store.insert_message(message).await {
            error!(
                connection_id = %session.connection_id(),
                message_id = %message.id,
                ai = message.is_from_ai(),
                error = %e,
                "Failed to persist message"
            );
            session.emit(ServerEvent::SendError {
                message: e.user_message(),
            });
            return Err(e);
        }
        Ok(())
    }
}
