//! # Broadcast Hub
//!
//! Registry of active connections. A broadcast walks the registry under one
//! lock and pushes onto each connection's outbound queue, so every listener sees
//! broadcasts in the order they were issued, interleaved correctly with the
//! events addressed to that connection alone.
//!
//! Delivery is best-effort: a connection whose writer has gone away is skipped.

use super::events::ServerEvent;
use super::session::{Outbound, Session};
use lib_core::dto::Message;
use lib_core::Result;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::debug;

/// Fan-out of chat messages to every active connection.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    listeners: Mutex<HashMap<String, Outbound>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the history, queue it as `chatHistory` for `session` and register
    /// the session, all under the listener lock.
    ///
    /// Broadcasts wait while the history loads. A message stored before the
    /// load is in the history; one stored after it is broadcast to the session
    /// once it is registered. A message stored before the load but broadcast
    /// after the join may arrive both ways. Returns the history length.
    ///
    /// # Errors
    ///
    /// Whatever `history` fails with. The session is not registered.
    pub async fn join<F>(&self, session: &Session, history: F) -> Result<usize>
    where
        F: Future<Output = Result<Vec<Message>>>,
    {
        let mut listeners = self.listeners.lock().await;
        let history = history.await?;
        let history_len = history.len();
        session.emit(ServerEvent::ChatHistory(history));
        listeners.insert(session.connection_id().to_string(), session.outbound());
        debug!(
            connection_id = %session.connection_id(),
            listeners = listeners.len(),
            history = history_len,
            "Listener joined"
        );
        Ok(history_len)
    }

    /// Stop delivering broadcasts to a connection. Returns whether it was registered.
    pub async fn unregister(&self, connection_id: &str) -> bool {
        let mut listeners = self.listeners.lock().await;
        let removed = listeners.remove(connection_id).is_some();
        if removed {
            debug!(
                connection_id = %connection_id,
                listeners = listeners.len(),
                "Listener unregistered"
            );
        }
        removed
    }

    /// Deliver a `receiveMessage` event to every registered connection,
    /// including the sender. Returns the number of connections reached.
    pub async fn broadcast(&self, message: &Message) -> usize {
        let listeners = self.listeners.lock().await;
        let mut delivered = 0;
        for (connection_id, outbound) in listeners.iter() {
            if outbound.send(ServerEvent::ReceiveMessage(message.clone())).is_ok() {
                delivered += 1;
            } else {
                debug!(connection_id = %connection_id, "Skipping listener with closed queue");
            }
        }
        delivered
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.lock().await.len()
    }

    pub async fn is_registered(&self, connection_id: &str) -> bool {
        self.listeners.lock().await.contains_key(connection_id)
    }
}
