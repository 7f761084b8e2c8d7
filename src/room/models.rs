use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::task::AbortHandle;

use crate::questions::QuizQuestion;

/// Points awarded for a correct answer.
pub const SCORE_INCREMENT: i32 = 10;

const ROOM_ID_LEN: usize = 6;
const ROOM_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A player inside a room, keyed by session id in the room's player map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub score: i32,
}

impl Player {
    pub fn new(name: String) -> Self {
        Self { name, score: 0 }
    }
}

/// Session id -> player, the roster shape broadcast to clients.
pub type PlayerMap = HashMap<String, Player>;

/// Per-room lifecycle. `Starting` covers the window while the question fetch
/// is outstanding: joins and further start attempts are rejected, answers are
/// not accepted, and a failed fetch drops the room back to `Lobby`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Lobby,
    Starting,
    InRound,
    Reveal,
}

/// One isolated game instance: roster, host, question stream, and the
/// answer tracking for the current round.
///
/// All methods are synchronous and never touch shared state; the repository
/// serializes access behind its lock so these transitions stay atomic.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub host_id: String,
    players: PlayerMap,
    /// Explicit insertion order. Host reassignment picks the earliest-joined
    /// remaining player rather than relying on map iteration order.
    join_order: Vec<String>,
    questions: Vec<QuizQuestion>,
    current_question: usize,
    answered: HashSet<String>,
    phase: RoomPhase,
    /// Handle of the pending post-reveal advance task, aborted when the room
    /// is deleted so the timer never fires against a defunct room.
    pub(crate) advance_timer: Option<AbortHandle>,
}

/// Generates a 6-character uppercase alphanumeric room code.
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_CHARSET[rng.random_range(0..ROOM_ID_CHARSET.len())] as char)
        .collect()
}

impl Room {
    /// Creates a room in the lobby phase with the creator as sole player and
    /// host.
    pub fn new(id: String, host_session_id: String, host_name: String) -> Self {
        let mut players = PlayerMap::new();
        players.insert(host_session_id.clone(), Player::new(host_name));

        Self {
            id,
            host_id: host_session_id.clone(),
            players,
            join_order: vec![host_session_id],
            questions: Vec::new(),
            current_question: 0,
            answered: HashSet::new(),
            phase: RoomPhase::Lobby,
            advance_timer: None,
        }
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// New joins are accepted only while the room sits in the lobby.
    pub fn is_joinable(&self) -> bool {
        self.phase == RoomPhase::Lobby
    }

    pub fn players(&self) -> &PlayerMap {
        &self.players
    }

    pub fn has_player(&self, session_id: &str) -> bool {
        self.players.contains_key(session_id)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Session ids of everyone currently in the room, for broadcast fan-out.
    pub fn member_ids(&self) -> Vec<String> {
        self.join_order.clone()
    }

    pub fn add_player(&mut self, session_id: String, name: String) {
        if !self.players.contains_key(&session_id) {
            self.players.insert(session_id.clone(), Player::new(name));
            self.join_order.push(session_id);
        }
    }

    /// Removes a player from the roster, the join order, and the answered
    /// set. Returns the removed player if they were present.
    pub fn remove_player(&mut self, session_id: &str) -> Option<Player> {
        let removed = self.players.remove(session_id)?;
        self.join_order.retain(|id| id != session_id);
        self.answered.remove(session_id);
        Some(removed)
    }

    pub fn is_host(&self, session_id: &str) -> bool {
        self.host_id == session_id
    }

    /// Reassigns the host to the earliest-joined remaining player. Returns
    /// the new host id, or None if the room is empty.
    pub fn elect_new_host(&mut self) -> Option<String> {
        let new_host = self.join_order.first().cloned()?;
        self.host_id = new_host.clone();
        Some(new_host)
    }

    pub fn mark_starting(&mut self) {
        self.phase = RoomPhase::Starting;
    }

    /// Returns the room to the lobby after a failed start.
    pub fn cancel_start(&mut self) {
        self.phase = RoomPhase::Lobby;
    }

    /// Installs the question sequence and enters the first round with a
    /// reset cursor and a cleared answered set.
    pub fn begin_game(&mut self, questions: Vec<QuizQuestion>) {
        self.questions = questions;
        self.current_question = 0;
        self.answered.clear();
        self.phase = RoomPhase::InRound;
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current_question)
    }

    /// 1-based number of the active question, as shown to players.
    pub fn question_number(&self) -> usize {
        self.current_question + 1
    }

    pub fn question_index(&self) -> usize {
        self.current_question
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Records an answer for the current round. Returns whether it was
    /// correct, or None when the answer is not accepted: wrong phase, sender
    /// not in the room, or a duplicate answer (idempotent, silently ignored).
    pub fn record_answer(&mut self, session_id: &str, selected_option: &str) -> Option<bool> {
        if self.phase != RoomPhase::InRound {
            return None;
        }
        if !self.players.contains_key(session_id) || self.answered.contains(session_id) {
            return None;
        }

        let correct = self
            .current_question()
            .map(|q| q.correct_answer == selected_option)?;

        self.answered.insert(session_id.to_string());
        if correct {
            if let Some(player) = self.players.get_mut(session_id) {
                player.score += SCORE_INCREMENT;
            }
        }
        Some(correct)
    }

    /// Whether every currently-present player has answered the active
    /// question. Evaluated against the live roster, so a departure mid-round
    /// can complete the round.
    pub fn all_answered(&self) -> bool {
        !self.players.is_empty() && self.players.keys().all(|id| self.answered.contains(id))
    }

    pub fn enter_reveal(&mut self) {
        self.phase = RoomPhase::Reveal;
    }

    /// Moves the cursor forward by one. Returns the next question when one
    /// remains (round state reset, phase back to `InRound`); None when the
    /// sequence is exhausted and the game is over.
    pub fn advance(&mut self) -> Option<&QuizQuestion> {
        self.current_question += 1;
        self.advance_timer = None;
        if self.current_question < self.questions.len() {
            self.answered.clear();
            self.phase = RoomPhase::InRound;
            self.questions.get(self.current_question)
        } else {
            None
        }
    }
}
