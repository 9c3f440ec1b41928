//! Event types for Rally's wire format.
//!
//! Every frame is one JSON object, adjacently tagged:
//!
//! ```text
//! {"event": "paddleMove", "data": {"dir": "up"}}
//! {"event": "waiting"}
//! ```
//!
//! Event names and field names are camelCase, because the other end is a
//! browser.

use std::fmt;

use rally_sim::{Direction, Score, Side, SimulationState};
use rally_transport::ConnectionId;
use serde::{Deserialize, Serialize};

/// Votes required to confirm a restart: one per player.
pub const VOTES_NEEDED: usize = 2;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of one match (a room).
///
/// Generated by the matchmaker; opaque to clients, which only echo it
/// back in logs. Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an event?
// ---------------------------------------------------------------------------

/// Addressing for events a room sends to its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection bound to the room.
    All,

    /// Everyone except this connection. Used to tell the survivor that
    /// its opponent left.
    AllExcept(ConnectionId),
}

impl Recipient {
    /// Whether `id` is addressed.
    pub fn includes(&self, id: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => *excluded != id,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// Anything that doesn't decode into one of these is logged and dropped
/// by the connection handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Ask to be matched with an opponent.
    JoinGame,

    /// Move this player's paddle one step.
    PaddleMove { dir: Direction },

    /// Vote to start a new match after game over.
    RestartGame,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// You're queued; no opponent yet.
    Waiting,

    /// Both players are bound and the match is about to start.
    RoomJoined {
        room_id: RoomId,
        player1_id: ConnectionId,
        player2_id: ConnectionId,
    },

    /// Full authoritative state. Sent every tick and after every
    /// accepted paddle move.
    GameState(SimulationState),

    /// Someone reached the win score.
    GameOver { winner: Side, final_score: Score },

    /// A restart vote was counted but not everyone has voted yet.
    RestartVoteUpdate {
        votes_received: usize,
        votes_needed: usize,
    },

    /// Both players voted; here is the fresh state.
    RestartConfirmed { state: SimulationState },

    /// Your opponent left. The room is gone.
    PlayerDisconnected,

    /// A request failed.
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::RoomJoined { .. } => "roomJoined",
            Self::GameState(_) => "gameState",
            Self::GameOver { .. } => "gameOver",
            Self::RestartVoteUpdate { .. } => "restartVoteUpdate",
            Self::RestartConfirmed { .. } => "restartConfirmed",
            Self::PlayerDisconnected => "playerDisconnected",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client matches on these exact JSON shapes, so each test
    //! pins one of them down.

    use rally_sim::CourtConfig;
    use serde_json::json;

    use super::*;

    // =====================================================================
    // Identity and addressing
    // =====================================================================

    #[test]
    fn test_room_id_is_plain_string() {
        let id = RoomId::new("room_1_1_ab");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("room_1_1_ab"));
        assert_eq!(id.to_string(), "room_1_1_ab");
        assert_eq!(id.as_str(), "room_1_1_ab");
    }

    #[test]
    fn test_recipient_includes() {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(2);

        assert!(Recipient::All.includes(a));
        assert!(!Recipient::AllExcept(a).includes(a));
        assert!(Recipient::AllExcept(a).includes(b));
    }

    // =====================================================================
    // ClientEvent
    // =====================================================================

    #[test]
    fn test_join_game_needs_no_data() {
        let event: ClientEvent = serde_json::from_value(json!({"event": "joinGame"})).unwrap();
        assert_eq!(event, ClientEvent::JoinGame);

        let event: ClientEvent =
            serde_json::from_value(json!({"event": "restartGame", "data": null})).unwrap();
        assert_eq!(event, ClientEvent::RestartGame);
    }

    #[test]
    fn test_paddle_move_shape() {
        let event = ClientEvent::PaddleMove { dir: Direction::Up };
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({"event": "paddleMove", "data": {"dir": "up"}})
        );
    }

    #[test]
    fn test_paddle_move_rejects_unknown_direction() {
        let result: Result<ClientEvent, _> =
            serde_json::from_value(json!({"event": "paddleMove", "data": {"dir": "sideways"}}));
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerEvent
    // =====================================================================

    #[test]
    fn test_waiting_has_no_data() {
        assert_eq!(
            serde_json::to_value(ServerEvent::Waiting).unwrap(),
            json!({"event": "waiting"})
        );
    }

    #[test]
    fn test_room_joined_shape() {
        let event = ServerEvent::RoomJoined {
            room_id: RoomId::new("room_9"),
            player1_id: ConnectionId::new(3),
            player2_id: ConnectionId::new(4),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "roomJoined",
                "data": {"roomId": "room_9", "player1Id": 3, "player2Id": 4}
            })
        );
    }

    #[test]
    fn test_game_state_carries_state_as_data() {
        let state = SimulationState::new(&CourtConfig::default());
        let json = serde_json::to_value(ServerEvent::GameState(state)).unwrap();

        assert_eq!(json["event"], "gameState");
        assert_eq!(json["data"]["ball"]["x"], 400.0);
        assert_eq!(json["data"]["gameOver"], false);
    }

    #[test]
    fn test_game_over_shape() {
        let event = ServerEvent::GameOver {
            winner: Side::Player1,
            final_score: Score {
                player1: 5,
                player2: 3,
            },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "gameOver",
                "data": {"winner": "player1", "finalScore": {"player1": 5, "player2": 3}}
            })
        );
    }

    #[test]
    fn test_restart_vote_update_shape() {
        let event = ServerEvent::RestartVoteUpdate {
            votes_received: 1,
            votes_needed: VOTES_NEEDED,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "restartVoteUpdate", "data": {"votesReceived": 1, "votesNeeded": 2}})
        );
    }

    #[test]
    fn test_restart_confirmed_wraps_state() {
        let state = SimulationState::new(&CourtConfig::default());
        let json = serde_json::to_value(ServerEvent::RestartConfirmed { state }).unwrap();
        assert_eq!(json["event"], "restartConfirmed");
        assert_eq!(json["data"]["state"]["score"]["player1"], 0);
    }

    #[test]
    fn test_error_shape() {
        assert_eq!(
            serde_json::to_value(ServerEvent::error("room unavailable")).unwrap(),
            json!({"event": "error", "data": {"message": "room unavailable"}})
        );
    }

    #[test]
    fn test_names_match_wire_tags() {
        let events = [
            ServerEvent::Waiting,
            ServerEvent::PlayerDisconnected,
            ServerEvent::error("x"),
            ServerEvent::GameState(SimulationState::new(&CourtConfig::default())),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name());
        }
    }
}
