use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::room::models::PlayerMap;
use crate::questions::QuizQuestion;

/// Message types for WebSocket communication. Tags are camelCase on the wire
/// (`createRoom`, `roomCreated`, ...), matching the client protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    // Client -> Server
    CreateRoom,
    JoinRoom,
    StartGame,
    SubmitAnswer,
    LeaveRoom,

    // Server -> Client
    RoomCreated,
    PlayerJoined,
    JoinError,
    GameStarted,
    NewQuestion,
    AnswerResult,
    UpdateScores,
    RevealAnswer,
    GameOver,
    PlayerLeft,
    NewHost,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server intent payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    pub player_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub room_id: String,
    pub player_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGamePayload {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerPayload {
    pub room_id: String,
    pub selected_option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoomPayload {
    pub room_id: String,
}

/// Server-to-Client event payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedPayload {
    pub room_id: String,
    pub players: PlayerMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedPayload {
    pub room_id: String,
    pub players: PlayerMap,
    pub new_player_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinErrorPayload {
    pub message: String,
}

/// The question as shown to players. Deliberately has no correct-answer
/// field; clients only learn it from `revealAnswer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestionPayload {
    pub question: String,
    pub options: Vec<String>,
    pub question_number: usize,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResultPayload {
    pub is_correct: bool,
    pub your_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealAnswerPayload {
    pub correct_answer: String,
    pub players: PlayerMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    pub final_players: PlayerMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftPayload {
    pub player_id: String,
    pub player_name: String,
    pub players: PlayerMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
                session_id: None,
            }),
        }
    }

    /// Create a roomCreated message (creator only)
    pub fn room_created(room_id: String, players: PlayerMap) -> Self {
        let payload = RoomCreatedPayload { room_id, players };
        Self::new(
            MessageType::RoomCreated,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a playerJoined message (whole room)
    pub fn player_joined(room_id: String, players: PlayerMap, new_player_name: String) -> Self {
        let payload = PlayerJoinedPayload {
            room_id,
            players,
            new_player_name,
        };
        Self::new(
            MessageType::PlayerJoined,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a joinError message (joining client only)
    pub fn join_error(message: String) -> Self {
        let payload = JoinErrorPayload { message };
        Self::new(
            MessageType::JoinError,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a gameStarted message (whole room, empty payload)
    pub fn game_started() -> Self {
        Self::new(MessageType::GameStarted, serde_json::Value::Null)
    }

    /// Create a newQuestion message (whole room)
    pub fn new_question(
        question: &QuizQuestion,
        question_number: usize,
        total_questions: usize,
    ) -> Self {
        let payload = NewQuestionPayload {
            question: question.question.clone(),
            options: question.options.clone(),
            question_number,
            total_questions,
        };
        Self::new(
            MessageType::NewQuestion,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create an answerResult message (answering client only)
    pub fn answer_result(is_correct: bool, your_score: i32) -> Self {
        let payload = AnswerResultPayload {
            is_correct,
            your_score,
        };
        Self::new(
            MessageType::AnswerResult,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create an updateScores message (whole room). The payload is the bare
    /// player mapping.
    pub fn update_scores(players: &PlayerMap) -> Self {
        Self::new(
            MessageType::UpdateScores,
            serde_json::to_value(players).unwrap(),
        )
    }

    /// Create a revealAnswer message (whole room)
    pub fn reveal_answer(correct_answer: String, players: PlayerMap) -> Self {
        let payload = RevealAnswerPayload {
            correct_answer,
            players,
        };
        Self::new(
            MessageType::RevealAnswer,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a gameOver message (whole room)
    pub fn game_over(final_players: PlayerMap) -> Self {
        let payload = GameOverPayload { final_players };
        Self::new(
            MessageType::GameOver,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a playerLeft message (whole room)
    pub fn player_left(player_id: String, player_name: String, players: PlayerMap) -> Self {
        let payload = PlayerLeftPayload {
            player_id,
            player_name,
            players,
        };
        Self::new(
            MessageType::PlayerLeft,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a newHost message (whole room). The payload is the bare host
    /// session id.
    pub fn new_host(host_id: String) -> Self {
        Self::new(MessageType::NewHost, serde_json::Value::String(host_id))
    }

    /// Create an error message
    pub fn error(message: String) -> Self {
        let payload = ErrorPayload { message };
        Self::new(MessageType::Error, serde_json::to_value(payload).unwrap())
    }
}
