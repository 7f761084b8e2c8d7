// Public API - what other modules can use
pub use error::RoomError;
pub use models::{generate_room_id, Player, PlayerMap, Room, RoomPhase};
pub use repository::{InMemoryRoomRepository, RoomRepository};
pub use service::{RoomService, REVEAL_DELAY};

// Internal modules
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
