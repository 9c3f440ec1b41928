//! Error types for the room layer.

use rally_protocol::RoomId;
use rally_transport::ConnectionId;

use crate::Slot;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A room with this id is already registered.
    #[error("room {0} already exists")]
    DuplicateRoom(RoomId),

    #[error("slot {1} of room {0} is already taken")]
    SlotTaken(RoomId, Slot),

    /// The connection already holds the other slot of this room.
    #[error("connection {0} already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomId),

    /// The connection is playing in a different room.
    #[error("connection {0} is already bound to room {1}")]
    AlreadyBound(ConnectionId, RoomId),

    /// The room is in a phase that doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The room's command channel is closed: the actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
