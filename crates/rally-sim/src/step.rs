//! The fixed simulation step and paddle input.

use rand::Rng;

use crate::{CourtConfig, Direction, Score, Side, SimulationState, Velocity};

/// Something notable that happened during a step.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Ball bounced off the top or bottom wall.
    WallBounce,
    /// Ball was returned by this side's paddle.
    PaddleHit(Side),
    /// Ball left the court; `scorer` gets the point.
    Scored { scorer: Side, score: Score },
    /// `winner` reached the win score. Always follows a `Scored`.
    MatchOver { winner: Side, score: Score },
}

/// Events produced by one call to [`step`], in the order they happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub events: Vec<SimEvent>,
}

impl StepOutcome {
    /// The winner, if this step ended the match.
    pub fn winner(&self) -> Option<Side> {
        self.events.iter().find_map(|e| match e {
            SimEvent::MatchOver { winner, .. } => Some(*winner),
            _ => None,
        })
    }

    /// Who scored during this step, if anyone.
    pub fn scorer(&self) -> Option<Side> {
        self.events.iter().find_map(|e| match e {
            SimEvent::Scored { scorer, .. } => Some(*scorer),
            _ => None,
        })
    }
}

/// Advance the match by one tick.
///
/// Order: integrate, wall bounce, paddle collisions, scoring, win check.
/// A finished match is left untouched and produces no events.
pub fn step<R: Rng + ?Sized>(
    state: &mut SimulationState,
    court: &CourtConfig,
    rng: &mut R,
) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    if state.game_over {
        return outcome;
    }

    state.ball.x += state.velocity.dx;
    state.ball.y += state.velocity.dy;

    let floor = court.height - court.ball_size;
    if state.ball.y <= 0.0 || state.ball.y >= floor {
        state.velocity.dy = -state.velocity.dy;
        state.ball.y = state.ball.y.clamp(0.0, floor);
        outcome.events.push(SimEvent::WallBounce);
    }

    if let Some(side) = paddle_collision(state, court) {
        state.velocity.dx = -state.velocity.dx;
        accelerate(&mut state.velocity, court);
        // Snap to the paddle face so the ball can't tunnel on the next step.
        state.ball.x = match side {
            Side::Player1 => court.paddle_width,
            Side::Player2 => court.right_face_x(),
        };
        outcome.events.push(SimEvent::PaddleHit(side));
    }

    let scorer = if state.ball.x < 0.0 {
        Some(Side::Player2)
    } else if state.ball.x > court.width {
        Some(Side::Player1)
    } else {
        None
    };

    if let Some(scorer) = scorer {
        state.score.award(scorer);
        serve(state, court, scorer.opponent(), rng);
        outcome.events.push(SimEvent::Scored {
            scorer,
            score: state.score,
        });

        if state.score.get(scorer) >= court.win_score {
            state.game_over = true;
            state.winner = Some(scorer);
            outcome.events.push(SimEvent::MatchOver {
                winner: scorer,
                score: state.score,
            });
        }
    }

    outcome
}

/// Move one paddle by a single step and clamp it to the court.
///
/// Ignored once the match is over.
pub fn apply_paddle(
    state: &mut SimulationState,
    court: &CourtConfig,
    side: Side,
    dir: Direction,
) {
    if state.game_over {
        return;
    }
    let paddle = state.paddles.get_mut(side);
    let y = match dir {
        Direction::Up => paddle.y - court.paddle_step,
        Direction::Down => paddle.y + court.paddle_step,
    };
    paddle.y = y.clamp(court.paddle_min_y(), court.paddle_max_y());
}

/// Which paddle (if any) the ball is hitting this step.
///
/// A paddle only counts when the ball is moving towards it, so a ball
/// that was just returned can't be caught twice.
fn paddle_collision(state: &SimulationState, court: &CourtConfig) -> Option<Side> {
    let ball = state.ball;
    let within = |side: Side| {
        let top = state.paddles.get(side).y;
        ball.y >= top && ball.y <= top + court.paddle_height
    };

    if ball.x >= 0.0
        && ball.x <= court.paddle_width
        && within(Side::Player1)
        && state.velocity.dx < 0.0
    {
        return Some(Side::Player1);
    }

    if ball.x >= court.right_face_x()
        && ball.x <= court.width
        && within(Side::Player2)
        && state.velocity.dx > 0.0
    {
        return Some(Side::Player2);
    }

    None
}

fn accelerate(velocity: &mut Velocity, court: &CourtConfig) {
    velocity.dx *= court.speed_growth;
    velocity.dy *= court.speed_growth;

    if let Some(max) = court.max_speed {
        let speed = velocity.speed();
        if speed > max {
            let scale = max / speed;
            velocity.dx *= scale;
            velocity.dy *= scale;
        }
    }
}

/// Recenter the ball and send it towards `receiver`.
fn serve<R: Rng + ?Sized>(
    state: &mut SimulationState,
    court: &CourtConfig,
    receiver: Side,
    rng: &mut R,
) {
    state.ball.x = court.width / 2.0;
    state.ball.y = court.height / 2.0;
    state.velocity.dx = match receiver {
        Side::Player1 => -court.serve_speed,
        Side::Player2 => court.serve_speed,
    };
    state.velocity.dy = if court.serve_spread > 0.0 {
        rng.random_range(-court.serve_spread..court.serve_spread)
    } else {
        0.0
    };
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::Ball;

    fn court() -> CourtConfig {
        CourtConfig::default()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn state_with(ball: Ball, velocity: Velocity) -> SimulationState {
        let mut state = SimulationState::new(&court());
        state.ball = ball;
        state.velocity = velocity;
        state
    }

    #[test]
    fn test_step_integrates_velocity() {
        let mut state = SimulationState::new(&court());
        let outcome = step(&mut state, &court(), &mut rng());
        assert_eq!(state.ball, Ball { x: 405.0, y: 303.0 });
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_top_wall_inverts_dy_and_clamps() {
        let mut state = state_with(Ball { x: 400.0, y: 2.0 }, Velocity { dx: 5.0, dy: -3.0 });
        let outcome = step(&mut state, &court(), &mut rng());
        assert_eq!(state.ball.y, 0.0);
        assert_eq!(state.velocity.dy, 3.0);
        assert_eq!(outcome.events, vec![SimEvent::WallBounce]);
    }

    #[test]
    fn test_bottom_wall_is_inclusive() {
        // 587 + 3 lands exactly on the floor (600 - 10).
        let mut state = state_with(Ball { x: 400.0, y: 587.0 }, Velocity { dx: 5.0, dy: 3.0 });
        step(&mut state, &court(), &mut rng());
        assert_eq!(state.ball.y, 590.0);
        assert_eq!(state.velocity.dy, -3.0);
    }

    #[test]
    fn test_left_paddle_returns_ball_and_speeds_it_up() {
        let court = court();
        let mut state = state_with(Ball { x: 400.0, y: 300.0 }, Velocity { dx: -5.0, dy: 0.5 });
        state.paddles.player1.y = 250.0;

        let mut steps = 0;
        let outcome = loop {
            steps += 1;
            let outcome = step(&mut state, &court, &mut rng());
            if !outcome.events.is_empty() {
                break outcome;
            }
            assert!(steps < 200, "ball never reached the paddle");
        };

        assert_eq!(steps, 78);
        assert_eq!(outcome.events, vec![SimEvent::PaddleHit(Side::Player1)]);
        assert!(state.velocity.dx > 0.0, "horizontal velocity should flip");
        assert!((state.velocity.dx - 5.25).abs() < 1e-9);
        assert!((state.velocity.dy - 0.525).abs() < 1e-9);
        assert_eq!(state.ball.x, court.paddle_width);
    }

    #[test]
    fn test_kickoff_rally_reaches_left_paddle_faster() {
        let court = court();
        let mut state = SimulationState::new(&court);
        assert_eq!((state.ball.x, state.ball.y), (400.0, 300.0));
        assert_eq!((state.velocity.dx, state.velocity.dy), (5.0, 3.0));

        // Both players keep the ball centered on their paddle.
        let mut steps = 0;
        let before = loop {
            steps += 1;
            let target = (state.ball.y - 45.0).clamp(court.paddle_min_y(), court.paddle_max_y());
            state.paddles.player1.y = target;
            state.paddles.player2.y = target;

            let before = state.velocity;
            let outcome = step(&mut state, &court, &mut rng());
            assert!(outcome.scorer().is_none(), "nobody should miss");
            if outcome.events.contains(&SimEvent::PaddleHit(Side::Player1)) {
                break before;
            }
            assert!(steps < 400, "ball never came back to the left paddle");
        };

        assert_eq!(steps, 223);
        assert_eq!(state.ball.x, court.paddle_width);
        let top = state.paddles.player1.y;
        assert!(state.ball.y >= top && state.ball.y <= top + court.paddle_height);

        assert!(before.dx < 0.0 && state.velocity.dx > 0.0, "horizontal velocity should flip");
        assert!((state.velocity.dx + before.dx * court.speed_growth).abs() < 1e-9);
        assert!((state.velocity.dy - before.dy * court.speed_growth).abs() < 1e-9);
    }

    #[test]
    fn test_right_paddle_snaps_ball_to_face() {
        let mut state = state_with(Ball { x: 778.0, y: 300.0 }, Velocity { dx: 5.0, dy: 0.0 });
        let outcome = step(&mut state, &court(), &mut rng());
        assert_eq!(outcome.events, vec![SimEvent::PaddleHit(Side::Player2)]);
        assert_eq!(state.ball.x, 780.0);
        assert!((state.velocity.dx + 5.25).abs() < 1e-9);
    }

    #[test]
    fn test_paddle_ignores_ball_moving_away() {
        // Inside the left band but already heading right.
        let mut state = state_with(Ball { x: 2.0, y: 300.0 }, Velocity { dx: 5.0, dy: 0.0 });
        let outcome = step(&mut state, &court(), &mut rng());
        assert!(outcome.events.is_empty());
        assert_eq!(state.velocity.dx, 5.0);
    }

    #[test]
    fn test_speed_growth_is_capped() {
        let mut state = state_with(Ball { x: 20.0, y: 300.0 }, Velocity { dx: -14.9, dy: 0.0 });
        step(&mut state, &court(), &mut rng());
        assert!((state.velocity.speed() - 15.0).abs() < 1e-9);
        assert!(state.velocity.dx > 0.0);
    }

    #[test]
    fn test_speed_growth_uncapped_when_disabled() {
        let court = CourtConfig {
            max_speed: None,
            ..CourtConfig::default()
        };
        let mut state = state_with(Ball { x: 20.0, y: 300.0 }, Velocity { dx: -14.9, dy: 0.0 });
        step(&mut state, &court, &mut rng());
        assert!((state.velocity.dx - 14.9 * 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_ball_past_left_edge_scores_for_player2() {
        let mut state = state_with(Ball { x: 2.0, y: 300.0 }, Velocity { dx: -5.0, dy: 0.0 });
        state.paddles.player1.y = 0.0; // out of the way

        let outcome = step(&mut state, &court(), &mut rng());

        assert_eq!(state.score.player2, 1);
        assert_eq!(state.score.player1, 0);
        assert_eq!(outcome.scorer(), Some(Side::Player2));
        assert_eq!(state.ball, Ball { x: 400.0, y: 300.0 });
        assert_eq!(state.velocity.dx, -5.0, "serve goes to the player who lost the point");
        assert!(state.velocity.dy >= -3.0 && state.velocity.dy < 3.0);
        assert!(!state.game_over);
    }

    #[test]
    fn test_ball_past_right_edge_scores_for_player1() {
        let mut state = state_with(Ball { x: 798.0, y: 300.0 }, Velocity { dx: 5.0, dy: 0.0 });
        state.paddles.player2.y = 0.0;

        step(&mut state, &court(), &mut rng());

        assert_eq!(state.score.player1, 1);
        assert_eq!(state.velocity.dx, 5.0);
    }

    #[test]
    fn test_reaching_win_score_ends_match() {
        let mut state = state_with(Ball { x: 2.0, y: 300.0 }, Velocity { dx: -5.0, dy: 0.0 });
        state.paddles.player1.y = 0.0;
        state.score.player2 = 4;

        let outcome = step(&mut state, &court(), &mut rng());

        assert!(state.game_over);
        assert_eq!(state.winner, Some(Side::Player2));
        assert_eq!(outcome.winner(), Some(Side::Player2));
        assert!(matches!(
            outcome.events.last(),
            Some(SimEvent::MatchOver { winner: Side::Player2, score }) if score.player2 == 5
        ));
    }

    #[test]
    fn test_finished_match_is_frozen() {
        let mut state = SimulationState::new(&court());
        state.game_over = true;
        state.winner = Some(Side::Player1);
        state.score.player1 = 5;
        let before = state.clone();

        for _ in 0..100 {
            let outcome = step(&mut state, &court(), &mut rng());
            assert!(outcome.events.is_empty());
        }
        apply_paddle(&mut state, &court(), Side::Player1, Direction::Down);

        assert_eq!(state, before);
    }

    #[test]
    fn test_apply_paddle_moves_and_clamps() {
        let court = court();
        let mut state = SimulationState::new(&court);

        apply_paddle(&mut state, &court, Side::Player1, Direction::Up);
        assert_eq!(state.paddles.player1.y, 245.0);

        apply_paddle(&mut state, &court, Side::Player2, Direction::Down);
        assert_eq!(state.paddles.player2.y, 255.0);

        state.paddles.player1.y = 2.0;
        apply_paddle(&mut state, &court, Side::Player1, Direction::Up);
        assert_eq!(state.paddles.player1.y, 0.0);

        state.paddles.player2.y = 498.0;
        apply_paddle(&mut state, &court, Side::Player2, Direction::Down);
        assert_eq!(state.paddles.player2.y, 500.0);
    }
}
