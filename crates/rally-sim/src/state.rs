//! Match state as the server owns it and as clients see it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CourtConfig;

/// One of the two players. Player 1 defends the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Player1,
    Player2,
}

impl Side {
    /// The other player.
    pub fn opponent(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player1 => write!(f, "player1"),
            Self::Player2 => write!(f, "player2"),
        }
    }
}

/// Paddle movement direction. Up is towards y = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Top-left corner of the ball.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f64,
    pub dy: f64,
}

impl Velocity {
    pub fn speed(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

/// Top edge of a paddle. Paddles only move vertically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddles {
    pub player1: Paddle,
    pub player2: Paddle,
}

impl Paddles {
    pub fn get(&self, side: Side) -> &Paddle {
        match side {
            Side::Player1 => &self.player1,
            Side::Player2 => &self.player2,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Player1 => &mut self.player1,
            Side::Player2 => &mut self.player2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub player1: u32,
    pub player2: u32,
}

impl Score {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Player1 => self.player1,
            Side::Player2 => self.player2,
        }
    }

    pub(crate) fn award(&mut self, side: Side) {
        match side {
            Side::Player1 => self.player1 += 1,
            Side::Player2 => self.player2 += 1,
        }
    }
}

/// The authoritative state of one match.
///
/// Serializes to the `gameState` payload clients render from. The ball's
/// velocity is server-only and is left out of the wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub ball: Ball,
    #[serde(skip)]
    pub velocity: Velocity,
    pub paddles: Paddles,
    pub score: Score,
    pub game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
}

impl SimulationState {
    /// Kickoff state: ball centered, paddles centered, 0–0.
    pub fn new(court: &CourtConfig) -> Self {
        let paddle = Paddle {
            y: court.paddle_start_y(),
        };
        Self {
            ball: Ball {
                x: court.width / 2.0,
                y: court.height / 2.0,
            },
            velocity: court.initial_velocity,
            paddles: Paddles {
                player1: paddle,
                player2: paddle,
            },
            score: Score::default(),
            game_over: false,
            winner: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_centered() {
        let state = SimulationState::new(&CourtConfig::default());
        assert_eq!(state.ball, Ball { x: 400.0, y: 300.0 });
        assert_eq!(state.velocity, Velocity { dx: 5.0, dy: 3.0 });
        assert_eq!(state.paddles.player1.y, 250.0);
        assert_eq!(state.paddles.player2.y, 250.0);
        assert_eq!(state.score, Score::default());
        assert!(!state.game_over);
        assert_eq!(state.winner, None);
    }

    #[test]
    fn test_wire_shape_matches_game_state_payload() {
        let state = SimulationState::new(&CourtConfig::default());
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["ball"]["x"], 400.0);
        assert_eq!(json["paddles"]["player1"]["y"], 250.0);
        assert_eq!(json["score"]["player2"], 0);
        assert_eq!(json["gameOver"], false);
        // No winner key until someone wins, and velocity never leaks.
        assert!(json.get("winner").is_none());
        assert!(json.get("velocity").is_none());
    }

    #[test]
    fn test_winner_serializes_as_player_tag() {
        let mut state = SimulationState::new(&CourtConfig::default());
        state.game_over = true;
        state.winner = Some(Side::Player2);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["winner"], "player2");
    }

    #[test]
    fn test_direction_wire_names() {
        let up: Direction = serde_json::from_str("\"up\"").unwrap();
        assert_eq!(up, Direction::Up);
        assert!(serde_json::from_str::<Direction>("\"left\"").is_err());
    }

    #[test]
    fn test_side_opponent_and_display() {
        assert_eq!(Side::Player1.opponent(), Side::Player2);
        assert_eq!(Side::Player2.to_string(), "player2");
    }
}
