// Library crate for the quiz game server
// This file exposes the public API for integration tests

pub mod questions;
pub mod room;
pub mod session;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use questions::{QuestionProvider, QuizQuestion};
pub use room::{InMemoryRoomRepository, RoomError, RoomRepository, RoomService};
pub use shared::AppState;
pub use websockets::{ConnectionManager, MessageType, QuizReceiveHandler, WebSocketMessage};
