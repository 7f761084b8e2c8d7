use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::error::RoomError;
use super::models::{generate_room_id, Room};
use super::repository::{
    AdvanceOutcome, AnswerOutcome, LeaveOutcome, RevealInfo, RoomRepository, StartOutcome,
};
use crate::questions::{QuestionProvider, QUESTION_TOPIC};
use crate::session::SessionRegistry;
use crate::websockets::connection_manager::ConnectionManager;
use crate::websockets::messages::WebSocketMessage;

/// Pause between revealing the correct answer and dispatching the next
/// question.
pub const REVEAL_DELAY: Duration = Duration::from_secs(3);

/// Game orchestration: executes client intents against the room store,
/// fans resulting events out to connected sessions, and paces rounds with
/// the post-reveal advance timer.
///
/// The service holds no game state of its own; every room mutation is a
/// single atomic repository call, so concurrent intents for the same room
/// serialize behind the store and cross-room traffic stays independent.
pub struct RoomService {
    repository: Arc<dyn RoomRepository>,
    provider: Arc<dyn QuestionProvider>,
    connections: Arc<dyn ConnectionManager>,
    sessions: SessionRegistry,
}

impl RoomService {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        provider: Arc<dyn QuestionProvider>,
        connections: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            repository,
            provider,
            connections,
            sessions: SessionRegistry::new(),
        }
    }

    /// Creates a room with the sender as sole player and host, and privately
    /// confirms with `roomCreated`.
    #[instrument(skip(self))]
    pub async fn create_room(&self, session_id: &str, player_name: &str) {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            self.send_error(session_id, &RoomError::NameRequired).await;
            return;
        }
        if self.sessions.room_of(session_id).await.is_some() {
            self.send_error(session_id, &RoomError::AlreadyInRoom).await;
            return;
        }

        // Codes are drawn from a 36^6 space; redraw on the rare collision
        // with an open room.
        let room_id = loop {
            let candidate = generate_room_id();
            let room = Room::new(
                candidate.clone(),
                session_id.to_string(),
                player_name.to_string(),
            );
            if self.repository.insert_if_vacant(room).await {
                break candidate;
            }
        };

        if let Err(e) = self.sessions.assign(session_id, &room_id).await {
            self.repository.leave(&room_id, session_id).await;
            self.send_error(session_id, &e).await;
            return;
        }

        info!(room_id = %room_id, session_id = %session_id, player_name, "Room created");

        if let Some(room) = self.repository.get(&room_id).await {
            self.connections
                .send_to_session(
                    session_id,
                    &WebSocketMessage::room_created(room_id, room.players().clone()),
                )
                .await;
        }
    }

    /// Adds the sender to an open room and announces the updated roster.
    /// Failures go back to the joining client only, as `joinError`.
    #[instrument(skip(self))]
    pub async fn join_room(&self, session_id: &str, room_id: &str, player_name: &str) {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            self.send_join_error(session_id, &RoomError::NameRequired)
                .await;
            return;
        }
        if self.sessions.room_of(session_id).await.is_some() {
            self.send_join_error(session_id, &RoomError::AlreadyInRoom)
                .await;
            return;
        }

        let joined = match self.repository.try_join(room_id, session_id, player_name).await {
            Ok(joined) => joined,
            Err(e) => {
                self.send_join_error(session_id, &e).await;
                return;
            }
        };

        if let Err(e) = self.sessions.assign(session_id, room_id).await {
            self.repository.leave(room_id, session_id).await;
            self.send_join_error(session_id, &e).await;
            return;
        }

        self.connections
            .send_to_sessions(
                &joined.recipients,
                &WebSocketMessage::player_joined(
                    room_id.to_string(),
                    joined.players,
                    player_name.to_string(),
                ),
            )
            .await;
    }

    /// Starts the game: host-only, lobby-only. The question fetch runs
    /// without holding the store lock, so other rooms are unaffected; the
    /// room rejects joins, answers, and further start attempts meanwhile.
    #[instrument(skip(self))]
    pub async fn start_game(&self, session_id: &str, room_id: &str) {
        if let Err(e) = self.repository.begin_start(room_id, session_id).await {
            self.send_error(session_id, &e).await;
            return;
        }

        let questions = self.provider.fetch(QUESTION_TOPIC).await;

        match self.repository.finish_start(room_id, questions).await {
            StartOutcome::Started {
                first_question,
                total_questions,
                recipients,
            } => {
                self.connections
                    .send_to_sessions(&recipients, &WebSocketMessage::game_started())
                    .await;
                self.connections
                    .send_to_sessions(
                        &recipients,
                        &WebSocketMessage::new_question(&first_question, 1, total_questions),
                    )
                    .await;
            }
            StartOutcome::EmptySet { recipients } => {
                self.connections
                    .send_to_sessions(
                        &recipients,
                        &WebSocketMessage::error(RoomError::QuestionGenerationEmpty.to_string()),
                    )
                    .await;
            }
            StartOutcome::RoomGone => {
                debug!(room_id = %room_id, "Room emptied during question generation");
            }
        }
    }

    /// Records an answer: private `answerResult` to the sender, room-wide
    /// `updateScores`, and — when the round completed — the reveal sequence.
    /// Duplicate or out-of-phase answers are dropped without a reply.
    #[instrument(skip(self))]
    pub async fn submit_answer(
        self: &Arc<Self>,
        session_id: &str,
        room_id: &str,
        selected_option: &str,
    ) {
        let outcome = match self
            .repository
            .record_answer(room_id, session_id, selected_option)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.send_error(session_id, &e).await;
                return;
            }
        };

        let AnswerOutcome::Recorded {
            is_correct,
            your_score,
            players,
            recipients,
            reveal,
        } = outcome
        else {
            return;
        };

        self.connections
            .send_to_session(
                session_id,
                &WebSocketMessage::answer_result(is_correct, your_score),
            )
            .await;
        self.connections
            .send_to_sessions(&recipients, &WebSocketMessage::update_scores(&players))
            .await;

        if let Some(reveal) = reveal {
            self.run_reveal(room_id, reveal).await;
        }
    }

    /// Removes the sender from a room: roster broadcast, host reassignment,
    /// room deletion when empty, and round completion if the departure left
    /// everyone remaining having answered.
    #[instrument(skip(self))]
    pub async fn leave_room(self: &Arc<Self>, session_id: &str, room_id: &str) {
        match self.repository.leave(room_id, session_id).await {
            LeaveOutcome::Left {
                player_id,
                player_name,
                players,
                new_host,
                reveal,
                recipients,
            } => {
                self.sessions.clear(session_id).await;
                self.connections
                    .send_to_sessions(
                        &recipients,
                        &WebSocketMessage::player_left(player_id, player_name, players),
                    )
                    .await;
                if let Some(host_id) = new_host {
                    self.connections
                        .send_to_sessions(&recipients, &WebSocketMessage::new_host(host_id))
                        .await;
                }
                if let Some(reveal) = reveal {
                    self.run_reveal(room_id, reveal).await;
                }
            }
            LeaveOutcome::RoomDeleted { player_name } => {
                self.sessions.clear(session_id).await;
                debug!(room_id = %room_id, player_name, "Last player left, room deleted");
            }
            LeaveOutcome::PlayerNotInRoom => {
                self.send_error(session_id, &RoomError::NotInRoom).await;
            }
            LeaveOutcome::RoomNotFound => {
                self.send_error(session_id, &RoomError::RoomNotFound).await;
            }
        }
    }

    /// Transport teardown: a dropped connection leaves its room exactly like
    /// an explicit `leaveRoom` intent.
    #[instrument(skip(self))]
    pub async fn disconnect(self: &Arc<Self>, session_id: &str) {
        if let Some(room_id) = self.sessions.room_of(session_id).await {
            self.leave_room(session_id, &room_id).await;
        }
    }

    /// Advances past a reveal. Called by the scheduled timer; stale calls
    /// (room gone, round already moved) are no-ops.
    pub async fn advance(&self, room_id: &str, expected_index: usize) {
        match self.repository.advance_round(room_id, expected_index).await {
            AdvanceOutcome::NextQuestion {
                question,
                question_number,
                total_questions,
                recipients,
            } => {
                self.connections
                    .send_to_sessions(
                        &recipients,
                        &WebSocketMessage::new_question(
                            &question,
                            question_number,
                            total_questions,
                        ),
                    )
                    .await;
            }
            AdvanceOutcome::GameOver {
                players,
                recipients,
            } => {
                self.connections
                    .send_to_sessions(&recipients, &WebSocketMessage::game_over(players))
                    .await;
                // The room is gone; release its members for new games.
                self.sessions.clear_members(&recipients).await;
            }
            AdvanceOutcome::Stale => {
                debug!(room_id = %room_id, expected_index, "Stale advance timer, ignoring");
            }
        }
    }

    /// Broadcasts the reveal and schedules the delayed advance, keyed to the
    /// revealed question so a raced deletion or restart is a no-op.
    async fn run_reveal(self: &Arc<Self>, room_id: &str, reveal: RevealInfo) {
        let question_index = reveal.question_index;
        self.connections
            .send_to_sessions(
                &reveal.recipients,
                &WebSocketMessage::reveal_answer(reveal.correct_answer, reveal.players),
            )
            .await;

        let service = Arc::clone(self);
        let room_id_owned = room_id.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep(REVEAL_DELAY).await;
            service.advance(&room_id_owned, question_index).await;
        });
        self.repository
            .store_advance_timer(room_id, task.abort_handle())
            .await;
    }

    async fn send_error(&self, session_id: &str, error: &RoomError) {
        self.connections
            .send_to_session(session_id, &WebSocketMessage::error(error.to_string()))
            .await;
    }

    async fn send_join_error(&self, session_id: &str, error: &RoomError) {
        self.connections
            .send_to_session(session_id, &WebSocketMessage::join_error(error.to_string()))
            .await;
    }
}
