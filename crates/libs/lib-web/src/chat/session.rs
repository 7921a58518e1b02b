//! # Chat Sessions
//!
//! One [`Session`] per websocket connection. A session owns its identity, its
//! private conversation memory and the sending half of its outbound queue.
//!
//! The session is driven by a single reader task, which takes it by `&mut`,
//! so events from one connection are processed strictly one after another.

use super::events::ServerEvent;
use lib_core::dto::{ChatTurn, Identity};
use tokio::sync::mpsc;
use tracing::debug;

/// Outbound queue feeding one connection's socket writer.
pub type Outbound = mpsc::UnboundedSender<ServerEvent>;

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Identity assigned, history not yet delivered; not a broadcast listener.
    Connecting,
    /// Registered with the hub and accepting events.
    Active,
    /// Disconnected. Terminal.
    Closed,
}

/// Per-connection ordered list of role-tagged turns sent to the completion service.
///
/// With a limit set, the oldest turns are dropped once the list grows past it.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ChatTurn>,
    limit: Option<usize>,
}

impl ConversationMemory {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            turns: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
        if let Some(limit) = self.limit {
            if self.turns.len() > limit {
                let excess = self.turns.len() - limit;
                self.turns.drain(..excess);
            }
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// One connected client.
#[derive(Debug)]
pub struct Session {
    connection_id: String,
    identity: Identity,
    memory: ConversationMemory,
    state: SessionState,
    outbound: Outbound,
}

impl Session {
    /// Create a session in the [`SessionState::Connecting`] state.
    pub fn new(
        connection_id: impl Into<String>,
        identity: Identity,
        memory_limit: Option<usize>,
        outbound: Outbound,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            identity,
            memory: ConversationMemory::new(memory_limit),
            state: SessionState::Connecting,
            outbound,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == SessionState::Active
    }

    /// A new handle on this session's outbound queue (for hub registration).
    pub fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    pub(crate) fn activate(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Active;
        }
    }

    pub(crate) fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Queue an event for this connection only.
    ///
    /// Returns `false` when the connection is closed or its writer is gone; the
    /// event is dropped in that case.
    pub fn emit(&self, event: ServerEvent) -> bool {
        if self.state == SessionState::Closed {
            debug!(
                connection_id = %self.connection_id,
                event = event.name(),
                "Dropping event for closed session"
            );
            return false;
        }
        self.outbound.send(event).is_ok()
    }
}
