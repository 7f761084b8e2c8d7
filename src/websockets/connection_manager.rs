use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::messages::WebSocketMessage;

/// Outbound fan-out: maps live session ids to their connection's send
/// channel. Events addressed to departed sessions are dropped silently.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(&self, session_id: String, sender: mpsc::UnboundedSender<String>);

    async fn remove_connection(&self, session_id: &str);

    /// Sends an event to a single session.
    async fn send_to_session(&self, session_id: &str, message: &WebSocketMessage);

    /// Broadcasts an event to every listed session.
    async fn send_to_sessions(&self, session_ids: &[String], message: &WebSocketMessage);
}

pub struct InMemoryConnectionManager {
    // session id -> sender
    connections: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<String>>>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(message: &WebSocketMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(error = %e, "Failed to encode outbound message");
            None
        }
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(&self, session_id: String, sender: mpsc::UnboundedSender<String>) {
        let mut connections = self.connections.write().await;
        connections.insert(session_id, sender);
    }

    async fn remove_connection(&self, session_id: &str) {
        let mut connections = self.connections.write().await;
        connections.remove(session_id);
    }

    async fn send_to_session(&self, session_id: &str, message: &WebSocketMessage) {
        let Some(text) = encode(message) else { return };
        let connections = self.connections.read().await;
        if let Some(sender) = connections.get(session_id) {
            let _ = sender.send(text);
        }
    }

    async fn send_to_sessions(&self, session_ids: &[String], message: &WebSocketMessage) {
        let Some(text) = encode(message) else { return };
        let connections = self.connections.read().await;
        for session_id in session_ids {
            if let Some(sender) = connections.get(session_id) {
                let _ = sender.send(text.clone());
            }
        }
    }
}
