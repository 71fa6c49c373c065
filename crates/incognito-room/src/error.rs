//! Error types for the room layer.

use incognito_protocol::RoomCode;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// A room with this code already exists.
    #[error("room code {0} already taken")]
    DuplicateCode(RoomCode),

    /// A player name was empty or whitespace-only.
    #[error("player name must not be blank")]
    EmptyPlayerName,

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
