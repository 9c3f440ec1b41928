//! Unified error type for the Rally server.

use rally_protocol::ProtocolError;
use rally_room::RoomError;
use rally_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps the layer errors.
///
/// `#[from]` on each variant lets `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RallyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Server-side bookkeeping disagreed with itself, e.g. the
    /// matchmaker paired with a connection the lobby no longer knows.
    /// Fatal to the request that hit it, never to the process.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
