//! Matchmaking for Rally.
//!
//! Pairs connections two at a time in arrival order. At most one
//! connection ever waits; the next arrival is paired with it and both are
//! sent to the room id that was reserved when the first one queued.
//!
//! ```text
//! A joins  → Waiting { room_1 }
//! B joins  → Paired  { room_1, peer: A }
//! C joins  → Waiting { room_2 }
//! ```
//!
//! The [`Matchmaker`] itself is a plain `&mut self` state machine. The
//! server owns exactly one, behind an async mutex, which is what makes
//! "two concurrent joins never both wait" hold.

mod matchmaker;
mod room_id;

pub use matchmaker::{Matchmaker, Pairing};
pub use room_id::RoomIdGenerator;
