//! Match lifecycle for Rally.
//!
//! Each match runs as an isolated Tokio task (a room actor) that owns its
//! simulation state, its two connection bindings, the restart votes, and
//! its tick scheduler. Everything else talks to it through a
//! [`RoomHandle`].
//!
//! # Key types
//!
//! - [`SessionRegistry`]: creates and destroys rooms, maps connections
//!   to the room they play in
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomPhase`]: lifecycle state machine
//! - [`RoomConfig`]: court, tick rate, channel size

mod config;
mod error;
mod registry;
mod room;

pub use config::{RoomConfig, RoomPhase};
pub use error::RoomError;
pub use registry::{SessionRegistry, Teardown};
pub use room::{ConnectionSender, RoomHandle, RoomInfo, Slot};
