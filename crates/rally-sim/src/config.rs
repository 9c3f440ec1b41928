//! Court geometry and match rules.

use serde::{Deserialize, Serialize};

use crate::Velocity;

/// Fixed dimensions and tuning for one match.
///
/// All lengths are in court units (the client draws them 1:1 as pixels).
/// The defaults reproduce the classic 800×600 court.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtConfig {
    pub width: f64,
    pub height: f64,
    pub paddle_width: f64,
    pub paddle_height: f64,
    /// Distance a paddle travels per accepted `paddleMove`.
    pub paddle_step: f64,
    /// Side length of the (square) ball.
    pub ball_size: f64,
    /// Ball velocity at kickoff and after a confirmed restart.
    pub initial_velocity: Velocity,
    /// Horizontal speed of a serve after a point.
    pub serve_speed: f64,
    /// A serve's vertical speed is drawn uniformly from `[-spread, spread)`.
    pub serve_spread: f64,
    /// Velocity multiplier applied on every paddle hit.
    pub speed_growth: f64,
    /// Upper bound on ball speed (vector magnitude). `None` lets paddle
    /// hits accelerate the ball without limit.
    pub max_speed: Option<f64>,
    /// First side to reach this many points wins.
    pub win_score: u32,
}

impl Default for CourtConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            paddle_width: 10.0,
            paddle_height: 100.0,
            paddle_step: 5.0,
            ball_size: 10.0,
            initial_velocity: Velocity { dx: 5.0, dy: 3.0 },
            serve_speed: 5.0,
            serve_spread: 3.0,
            speed_growth: 1.05,
            max_speed: Some(15.0),
            win_score: 5,
        }
    }
}

impl CourtConfig {
    /// Lowest y a paddle's top edge may reach.
    pub fn paddle_min_y(&self) -> f64 {
        0.0
    }

    /// Highest y a paddle's top edge may reach.
    pub fn paddle_max_y(&self) -> f64 {
        self.height - self.paddle_height
    }

    /// Paddle top edge that centers it vertically.
    pub fn paddle_start_y(&self) -> f64 {
        self.height / 2.0 - self.paddle_height / 2.0
    }

    /// x of the right paddle's inner face, as seen by the ball's left edge.
    pub(crate) fn right_face_x(&self) -> f64 {
        self.width - self.paddle_width - self.ball_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_classic_court() {
        let court = CourtConfig::default();
        assert_eq!(court.width, 800.0);
        assert_eq!(court.height, 600.0);
        assert_eq!(court.win_score, 5);
        assert_eq!(court.max_speed, Some(15.0));
    }

    #[test]
    fn test_paddle_bounds() {
        let court = CourtConfig::default();
        assert_eq!(court.paddle_min_y(), 0.0);
        assert_eq!(court.paddle_max_y(), 500.0);
        assert_eq!(court.paddle_start_y(), 250.0);
        assert_eq!(court.right_face_x(), 780.0);
    }
}
