use async_trait::async_trait;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::room::RoomService;
use crate::shared::AppState;
use crate::websockets::messages::{
    CreateRoomPayload, JoinRoomPayload, LeaveRoomPayload, MessageType, StartGamePayload,
    SubmitAnswerPayload, WebSocketMessage,
};

use super::socket::{Connection, MessageHandler};

/// Translates inbound client intents into room operations.
pub struct QuizReceiveHandler {
    service: Arc<RoomService>,
}

impl QuizReceiveHandler {
    pub fn new(service: Arc<RoomService>) -> Self {
        Self { service }
    }

    fn parse_payload<T: DeserializeOwned>(
        session_id: &str,
        message_type: &MessageType,
        payload: serde_json::Value,
    ) -> Option<T> {
        match serde_json::from_value(payload) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    message_type = ?message_type,
                    error = %e,
                    "Malformed intent payload"
                );
                None
            }
        }
    }
}

#[async_trait]
impl MessageHandler for QuizReceiveHandler {
    async fn handle_message(&self, session_id: &str, message: String) {
        debug!(session_id = %session_id, message = %message, "Received message");

        let ws_message = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(ws_message) => ws_message,
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to parse WebSocket message"
                );
                return;
            }
        };

        let message_type = ws_message.message_type.clone();
        match message_type {
            MessageType::CreateRoom => {
                if let Some(p) = Self::parse_payload::<CreateRoomPayload>(
                    session_id,
                    &message_type,
                    ws_message.payload,
                ) {
                    self.service.create_room(session_id, &p.player_name).await;
                }
            }
            MessageType::JoinRoom => {
                if let Some(p) = Self::parse_payload::<JoinRoomPayload>(
                    session_id,
                    &message_type,
                    ws_message.payload,
                ) {
                    self.service
                        .join_room(session_id, &p.room_id, &p.player_name)
                        .await;
                }
            }
            MessageType::StartGame => {
                if let Some(p) = Self::parse_payload::<StartGamePayload>(
                    session_id,
                    &message_type,
                    ws_message.payload,
                ) {
                    self.service.start_game(session_id, &p.room_id).await;
                }
            }
            MessageType::SubmitAnswer => {
                if let Some(p) = Self::parse_payload::<SubmitAnswerPayload>(
                    session_id,
                    &message_type,
                    ws_message.payload,
                ) {
                    self.service
                        .submit_answer(session_id, &p.room_id, &p.selected_option)
                        .await;
                }
            }
            MessageType::LeaveRoom => {
                if let Some(p) = Self::parse_payload::<LeaveRoomPayload>(
                    session_id,
                    &message_type,
                    ws_message.payload,
                ) {
                    self.service.leave_room(session_id, &p.room_id).await;
                }
            }
            other => {
                debug!(message_type = ?other, "Unhandled message type");
            }
        }
    }
}

/// WebSocket endpoint: GET /ws. Each upgraded connection becomes one
/// session; no identity beyond the connection itself.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, app_state))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(socket: axum::extract::ws::WebSocket, app_state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, "WebSocket connection established");

    // Outbound channel (app -> client), registered for room fan-out.
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    app_state
        .connection_manager
        .add_connection(session_id.clone(), outbound_sender)
        .await;

    let message_handler = Arc::new(QuizReceiveHandler::new(app_state.room_service.clone()));
    let connection = Connection::new(
        session_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler,
    );

    match connection.run().await {
        Ok(()) => {
            info!(session_id = %session_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(session_id = %session_id, error = ?e, "WebSocket connection error");
        }
    }

    // Teardown: unregister the connection, then run the same leave path an
    // explicit leaveRoom intent would take.
    app_state
        .connection_manager
        .remove_connection(&session_id)
        .await;
    app_state.room_service.disconnect(&session_id).await;

    info!(session_id = %session_id, "Session cleaned up after disconnect");
}
