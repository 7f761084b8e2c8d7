use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use quizarena::questions::{QuestionProvider, QuizQuestion};
use quizarena::room::{InMemoryRoomRepository, RoomService};
use quizarena::websockets::{ConnectionManager, MessageType, WebSocketMessage};

/// Connection manager double that records every outbound event per session
/// instead of writing to sockets.
pub struct RecordingConnectionManager {
    messages: Mutex<HashMap<String, Vec<WebSocketMessage>>>,
}

impl RecordingConnectionManager {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
        }
    }

    pub async fn messages_for(&self, session_id: &str) -> Vec<WebSocketMessage> {
        let messages = self.messages.lock().await;
        messages.get(session_id).cloned().unwrap_or_default()
    }

    pub async fn of_type(&self, session_id: &str, t: MessageType) -> Vec<WebSocketMessage> {
        self.messages_for(session_id)
            .await
            .into_iter()
            .filter(|m| m.message_type == t)
            .collect()
    }

    pub async fn last_of_type(&self, session_id: &str, t: MessageType) -> Option<WebSocketMessage> {
        self.of_type(session_id, t).await.into_iter().last()
    }

    pub async fn count_of_type(&self, session_id: &str, t: MessageType) -> usize {
        self.of_type(session_id, t).await.len()
    }

    pub async fn clear(&self) {
        let mut messages = self.messages.lock().await;
        messages.clear();
    }
}

#[async_trait]
impl ConnectionManager for RecordingConnectionManager {
    async fn add_connection(&self, _session_id: String, _sender: mpsc::UnboundedSender<String>) {}

    async fn remove_connection(&self, _session_id: &str) {}

    async fn send_to_session(&self, session_id: &str, message: &WebSocketMessage) {
        let mut messages = self.messages.lock().await;
        messages
            .entry(session_id.to_string())
            .or_default()
            .push(message.clone());
    }

    async fn send_to_sessions(&self, session_ids: &[String], message: &WebSocketMessage) {
        let mut messages = self.messages.lock().await;
        for session_id in session_ids {
            messages
                .entry(session_id.clone())
                .or_default()
                .push(message.clone());
        }
    }
}

/// Question provider double serving a fixed set.
pub struct StubQuestionProvider {
    questions: Vec<QuizQuestion>,
}

impl StubQuestionProvider {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self { questions }
    }
}

#[async_trait]
impl QuestionProvider for StubQuestionProvider {
    async fn fetch(&self, _topic: &str) -> Vec<QuizQuestion> {
        self.questions.clone()
    }
}

pub fn sample_questions(n: usize) -> Vec<QuizQuestion> {
    (0..n)
        .map(|i| QuizQuestion {
            question: format!("Вопрос {i}?"),
            options: vec!["а".into(), "б".into(), "в".into(), "г".into()],
            correct_answer: "б".into(),
        })
        .collect()
}

pub struct TestSetup {
    pub service: Arc<RoomService>,
    pub connections: Arc<RecordingConnectionManager>,
    pub repository: Arc<InMemoryRoomRepository>,
}

/// Wires a RoomService against the recording doubles and the given provider.
pub fn setup_with_provider(provider: Arc<dyn QuestionProvider>) -> TestSetup {
    let repository = Arc::new(InMemoryRoomRepository::new());
    let connections = Arc::new(RecordingConnectionManager::new());
    let service = Arc::new(RoomService::new(
        repository.clone(),
        provider,
        connections.clone(),
    ));
    TestSetup {
        service,
        connections,
        repository,
    }
}

pub fn setup_with_questions(questions: Vec<QuizQuestion>) -> TestSetup {
    setup_with_provider(Arc::new(StubQuestionProvider::new(questions)))
}

impl TestSetup {
    /// Creates a room for the session and returns the generated room id.
    pub async fn create_room(&self, session_id: &str, player_name: &str) -> String {
        self.service.create_room(session_id, player_name).await;
        let created = self
            .connections
            .last_of_type(session_id, MessageType::RoomCreated)
            .await
            .expect("roomCreated should have been sent");
        created.payload["roomId"]
            .as_str()
            .expect("roomCreated carries the room id")
            .to_string()
    }
}
