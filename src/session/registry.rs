use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::room::error::RoomError;

/// Tracks which room each live session belongs to.
///
/// A session is created per websocket connection and may belong to at most
/// one room at a time; the explicit mapping also lets the disconnect path
/// resolve the affected room without scanning every open room.
pub struct SessionRegistry {
    memberships: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            memberships: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Binds a session to a room. Fails when the session is already in one.
    pub async fn assign(&self, session_id: &str, room_id: &str) -> Result<(), RoomError> {
        let mut memberships = self.memberships.write().await;
        if memberships.contains_key(session_id) {
            return Err(RoomError::AlreadyInRoom);
        }
        memberships.insert(session_id.to_string(), room_id.to_string());
        debug!(session_id = %session_id, room_id = %room_id, "Session bound to room");
        Ok(())
    }

    /// The room a session currently belongs to, if any.
    pub async fn room_of(&self, session_id: &str) -> Option<String> {
        let memberships = self.memberships.read().await;
        memberships.get(session_id).cloned()
    }

    /// Unbinds a session, returning the room it was in.
    pub async fn clear(&self, session_id: &str) -> Option<String> {
        let mut memberships = self.memberships.write().await;
        let room = memberships.remove(session_id);
        if let Some(room_id) = &room {
            debug!(session_id = %session_id, room_id = %room_id, "Session unbound from room");
        }
        room
    }

    /// Unbinds every listed session at once, used when a room is destroyed.
    pub async fn clear_members(&self, session_ids: &[String]) {
        let mut memberships = self.memberships.write().await;
        for session_id in session_ids {
            memberships.remove(session_id);
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
