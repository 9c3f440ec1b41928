//! Transport layer for Rally.
//!
//! Provides the [`Transport`] and [`Connection`] traits the server is
//! written against, plus a WebSocket implementation.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a connection, unique for the life of the process.
///
/// Serializes as a plain number so it can be handed to clients
/// (e.g. in `roomJoined`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw number, as sent to clients.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that yields upgraded client connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Next client, after the protocol handshake has completed.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Where the listener is bound. Useful after binding port 0.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// A single connection that can send and receive frames.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// the read half and the write half are independent.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Write one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read one frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Start a clean close.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ConnectionId::new(9)).unwrap();
        assert_eq!(json, "9");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "left");
        map.insert(ConnectionId::new(2), "right");
        assert_eq!(map[&ConnectionId::new(1)], "left");
    }
}
