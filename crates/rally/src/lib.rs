//! # Rally
//!
//! Authoritative two-player Pong over WebSockets.
//!
//! Clients send `joinGame` and are paired first-come first-served. Each
//! pair gets a room that owns the simulation and ticks it at 60 Hz,
//! broadcasting the full state every tick. Paddle input and restart votes
//! go straight to the player's room; a disconnect tears the room down and
//! tells the other player.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rally::prelude::*;
//!
//! # async fn start() -> Result<(), RallyError> {
//! let config = ServerConfig::from_env()?;
//! let server = RallyServer::builder().config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod lobby;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::RallyError;
pub use lobby::{JOIN_FAILED, Lobby, Route};
pub use server::{RallyServer, RallyServerBuilder};

/// Common imports for running a server.
pub mod prelude {
    pub use crate::{ConfigError, RallyError, RallyServer, RallyServerBuilder, ServerConfig};
    pub use rally_protocol::{ClientEvent, ServerEvent};
    pub use rally_room::RoomConfig;
    pub use rally_sim::{CourtConfig, Direction, Side};
    pub use rally_tick::TickConfig;
}
