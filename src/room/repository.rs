use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use super::error::RoomError;
use super::models::{PlayerMap, Room, RoomPhase};
use crate::questions::QuizQuestion;

/// Successful join: the updated roster plus who should hear about it.
#[derive(Debug, Clone)]
pub struct JoinedRoom {
    pub players: PlayerMap,
    pub recipients: Vec<String>,
}

/// Round completion data: everyone present has answered, the room has
/// entered the reveal phase.
#[derive(Debug, Clone)]
pub struct RevealInfo {
    pub correct_answer: String,
    pub players: PlayerMap,
    pub question_index: usize,
    pub recipients: Vec<String>,
}

/// Result of completing a start attempt once questions are available.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// Game is now in its first round.
    Started {
        first_question: QuizQuestion,
        total_questions: usize,
        recipients: Vec<String>,
    },
    /// Generation produced nothing; the room is back in the lobby.
    EmptySet { recipients: Vec<String> },
    /// The room emptied out while the fetch was in flight.
    RoomGone,
}

/// Result of recording an answer.
#[derive(Debug, Clone)]
pub enum AnswerOutcome {
    Recorded {
        is_correct: bool,
        your_score: i32,
        players: PlayerMap,
        recipients: Vec<String>,
        /// Present when this answer completed the round.
        reveal: Option<RevealInfo>,
    },
    /// Wrong phase, sender not present, or a duplicate answer. Silent.
    Ignored,
}

/// Result of advancing past a reveal.
#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    NextQuestion {
        question: QuizQuestion,
        question_number: usize,
        total_questions: usize,
        recipients: Vec<String>,
    },
    /// Question sequence exhausted; the room has been deleted.
    GameOver {
        players: PlayerMap,
        recipients: Vec<String>,
    },
    /// The room is gone or the round moved on; nothing to do.
    Stale,
}

/// Result of removing a player.
#[derive(Debug, Clone)]
pub enum LeaveOutcome {
    Left {
        player_id: String,
        player_name: String,
        players: PlayerMap,
        /// Set when the departing player was host.
        new_host: Option<String>,
        /// Set when the departure completed the current round.
        reveal: Option<RevealInfo>,
        recipients: Vec<String>,
    },
    /// Last player out; the room no longer exists.
    RoomDeleted { player_name: String },
    PlayerNotInRoom,
    RoomNotFound,
}

/// Storage and atomic state transitions for rooms.
///
/// Every mutating operation runs as a single critical section so the room
/// invariants (one answer per player per round, emptiness == deletion,
/// cursor only moves forward by one) hold under concurrent intents.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Inserts a freshly created room. Returns false when the id is already
    /// taken by an open room, so callers can redraw the code.
    async fn insert_if_vacant(&self, room: Room) -> bool;

    /// Snapshot of a room for reads and tests.
    async fn get(&self, room_id: &str) -> Option<Room>;

    async fn try_join(
        &self,
        room_id: &str,
        session_id: &str,
        player_name: &str,
    ) -> Result<JoinedRoom, RoomError>;

    /// Gates a start attempt: host-only, lobby-only. On success the room is
    /// parked in the `Starting` phase until `finish_start` is called.
    async fn begin_start(&self, room_id: &str, requester_id: &str) -> Result<(), RoomError>;

    /// Completes a start attempt with the generated question sequence.
    async fn finish_start(&self, room_id: &str, questions: Vec<QuizQuestion>) -> StartOutcome;

    async fn record_answer(
        &self,
        room_id: &str,
        session_id: &str,
        selected_option: &str,
    ) -> Result<AnswerOutcome, RoomError>;

    /// Advances past a reveal, but only if the room is still revealing the
    /// question the caller saw; stale timers are no-ops.
    async fn advance_round(&self, room_id: &str, expected_index: usize) -> AdvanceOutcome;

    async fn leave(&self, room_id: &str, session_id: &str) -> LeaveOutcome;

    /// Stores the abort handle of the pending advance task so room deletion
    /// can cancel it.
    async fn store_advance_timer(&self, room_id: &str, handle: AbortHandle);
}

/// In-memory room store. All game state is single-process; persistence
/// across restarts is out of scope.
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<String, Room>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes a room and cancels its pending advance timer, if any. Deletion
/// and timer cancellation happen together so a scheduled advance can never
/// observe a half-deleted room.
fn delete_room(rooms: &mut HashMap<String, Room>, room_id: &str) {
    if let Some(room) = rooms.remove(room_id) {
        if let Some(timer) = room.advance_timer {
            timer.abort();
        }
        info!(room_id = %room_id, "Room deleted");
    }
}

/// Enters the reveal phase when everyone still present has answered.
fn try_reveal(room: &mut Room) -> Option<RevealInfo> {
    if room.phase() != RoomPhase::InRound || !room.all_answered() {
        return None;
    }
    let correct_answer = room.current_question()?.correct_answer.clone();
    room.enter_reveal();
    Some(RevealInfo {
        correct_answer,
        players: room.players().clone(),
        question_index: room.question_index(),
        recipients: room.member_ids(),
    })
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    async fn insert_if_vacant(&self, room: Room) -> bool {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.contains_key(&room.id) {
            warn!(room_id = %room.id, "Room code collision, redrawing");
            return false;
        }
        debug!(room_id = %room.id, host_id = %room.host_id, "Room created");
        rooms.insert(room.id.clone(), room);
        true
    }

    async fn get(&self, room_id: &str) -> Option<Room> {
        let rooms = self.rooms.lock().unwrap();
        rooms.get(room_id).cloned()
    }

    #[instrument(skip(self))]
    async fn try_join(
        &self,
        room_id: &str,
        session_id: &str,
        player_name: &str,
    ) -> Result<JoinedRoom, RoomError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;

        if !room.is_joinable() {
            debug!(room_id = %room_id, phase = ?room.phase(), "Join rejected, game already started");
            return Err(RoomError::GameAlreadyStarted);
        }

        room.add_player(session_id.to_string(), player_name.to_string());
        info!(
            room_id = %room_id,
            session_id = %session_id,
            player_name = %player_name,
            player_count = room.players().len(),
            "Player joined room"
        );

        Ok(JoinedRoom {
            players: room.players().clone(),
            recipients: room.member_ids(),
        })
    }

    #[instrument(skip(self))]
    async fn begin_start(&self, room_id: &str, requester_id: &str) -> Result<(), RoomError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;

        if !room.is_host(requester_id) {
            debug!(room_id = %room_id, requester = %requester_id, "Start rejected, not host");
            return Err(RoomError::NotHost);
        }
        if room.phase() != RoomPhase::Lobby {
            debug!(room_id = %room_id, phase = ?room.phase(), "Start rejected, game already started");
            return Err(RoomError::GameAlreadyStarted);
        }

        room.mark_starting();
        info!(room_id = %room_id, "Start accepted, generating questions");
        Ok(())
    }

    #[instrument(skip(self, questions))]
    async fn finish_start(&self, room_id: &str, questions: Vec<QuizQuestion>) -> StartOutcome {
        let mut rooms = self.rooms.lock().unwrap();
        let room = match rooms.get_mut(room_id) {
            Some(room) if room.phase() == RoomPhase::Starting => room,
            _ => {
                debug!(room_id = %room_id, "Room gone before start could complete");
                return StartOutcome::RoomGone;
            }
        };

        if questions.is_empty() {
            warn!(room_id = %room_id, "Empty question set, returning room to lobby");
            room.cancel_start();
            return StartOutcome::EmptySet {
                recipients: room.member_ids(),
            };
        }

        let total_questions = questions.len();
        room.begin_game(questions);
        let first_question = room
            .current_question()
            .expect("non-empty question set has a first question")
            .clone();

        info!(room_id = %room_id, total_questions, "Game started");

        StartOutcome::Started {
            first_question,
            total_questions,
            recipients: room.member_ids(),
        }
    }

    #[instrument(skip(self))]
    async fn record_answer(
        &self,
        room_id: &str,
        session_id: &str,
        selected_option: &str,
    ) -> Result<AnswerOutcome, RoomError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;

        let is_correct = match room.record_answer(session_id, selected_option) {
            Some(correct) => correct,
            None => {
                debug!(room_id = %room_id, session_id = %session_id, "Answer ignored");
                return Ok(AnswerOutcome::Ignored);
            }
        };

        let your_score = room
            .players()
            .get(session_id)
            .map(|p| p.score)
            .unwrap_or_default();

        debug!(
            room_id = %room_id,
            session_id = %session_id,
            is_correct,
            your_score,
            "Answer recorded"
        );

        // The reveal transition happens in the same critical section as the
        // answer, so two racing final answers cannot both trigger it.
        let reveal = try_reveal(room);

        Ok(AnswerOutcome::Recorded {
            is_correct,
            your_score,
            players: room.players().clone(),
            recipients: room.member_ids(),
            reveal,
        })
    }

    #[instrument(skip(self))]
    async fn advance_round(&self, room_id: &str, expected_index: usize) -> AdvanceOutcome {
        let mut rooms = self.rooms.lock().unwrap();
        let room = match rooms.get_mut(room_id) {
            Some(room) => room,
            None => return AdvanceOutcome::Stale,
        };

        if room.phase() != RoomPhase::Reveal || room.question_index() != expected_index {
            debug!(room_id = %room_id, expected_index, "Stale advance, ignoring");
            return AdvanceOutcome::Stale;
        }

        if let Some(question) = room.advance() {
            let outcome = AdvanceOutcome::NextQuestion {
                question: question.clone(),
                question_number: room.question_number(),
                total_questions: room.total_questions(),
                recipients: room.member_ids(),
            };
            debug!(room_id = %room_id, question_number = room.question_number(), "Next question dispatched");
            return outcome;
        }

        // Sequence exhausted: game over is terminal and destroys the room.
        let players = room.players().clone();
        let recipients = room.member_ids();
        info!(room_id = %room_id, "Game over");
        delete_room(&mut rooms, room_id);

        AdvanceOutcome::GameOver {
            players,
            recipients,
        }
    }

    #[instrument(skip(self))]
    async fn leave(&self, room_id: &str, session_id: &str) -> LeaveOutcome {
        let mut rooms = self.rooms.lock().unwrap();
        let room = match rooms.get_mut(room_id) {
            Some(room) => room,
            None => return LeaveOutcome::RoomNotFound,
        };

        let was_host = room.is_host(session_id);
        let removed = match room.remove_player(session_id) {
            Some(player) => player,
            None => return LeaveOutcome::PlayerNotInRoom,
        };

        info!(
            room_id = %room_id,
            session_id = %session_id,
            player_name = %removed.name,
            "Player left room"
        );

        if room.is_empty() {
            delete_room(&mut rooms, room_id);
            return LeaveOutcome::RoomDeleted {
                player_name: removed.name,
            };
        }

        let new_host = if was_host {
            let host = room.elect_new_host();
            if let Some(host_id) = &host {
                info!(room_id = %room_id, new_host = %host_id, "Host reassigned");
            }
            host
        } else {
            None
        };

        // The departure may have completed the round for everyone remaining.
        let reveal = try_reveal(room);

        LeaveOutcome::Left {
            player_id: session_id.to_string(),
            player_name: removed.name,
            players: room.players().clone(),
            new_host,
            reveal,
            recipients: room.member_ids(),
        }
    }

    async fn store_advance_timer(&self, room_id: &str, handle: AbortHandle) {
        let mut rooms = self.rooms.lock().unwrap();
        match rooms.get_mut(room_id) {
            Some(room) => room.advance_timer = Some(handle),
            // Room vanished between scheduling and registration.
            None => handle.abort(),
        }
    }
}
