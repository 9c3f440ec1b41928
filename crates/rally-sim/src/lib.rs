//! Authoritative Pong simulation for Rally.
//!
//! Everything in this crate is a plain function over plain data: no
//! clocks, no channels, no logging. The room actor owns a
//! [`SimulationState`] and calls [`step`] once per tick and
//! [`apply_paddle`] for every accepted paddle input.
//!
//! Randomness (the vertical component of a serve) is passed in as an
//! [`rand::Rng`], so tests can drive the engine with a seeded generator.

mod config;
mod state;
mod step;

pub use config::CourtConfig;
pub use state::{Ball, Direction, Paddle, Paddles, Score, Side, SimulationState, Velocity};
pub use step::{SimEvent, StepOutcome, apply_paddle, step};
