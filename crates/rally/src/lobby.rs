//! Join and disconnect orchestration.
//!
//! The lobby owns the matchmaker, the session registry, and one entry per
//! open connection. The server keeps it behind a single mutex, so queueing,
//! pairing, room creation, and teardown happen in one total order.

use std::collections::HashMap;

use rally_matchmaker::{Matchmaker, Pairing};
use rally_protocol::{RoomId, ServerEvent};
use rally_room::{ConnectionSender, RoomConfig, RoomError, RoomHandle, SessionRegistry, Slot};
use rally_transport::ConnectionId;
use tokio::sync::watch;

use crate::RallyError;

/// Sent to both players when pairing them into a room fails.
pub const JOIN_FAILED: &str = "Failed to join game";

/// The room a connection's input goes to, if any.
pub type Route = watch::Receiver<Option<RoomHandle>>;

struct ConnectionEntry {
    outbox: ConnectionSender,
    route: watch::Sender<Option<RoomHandle>>,
}

impl ConnectionEntry {
    fn notify(&self, conn: ConnectionId, event: ServerEvent) {
        if let Err(e) = self.outbox.try_send(event) {
            tracing::debug!(%conn, error = %e, "outbox rejected lobby event");
        }
    }
}

/// Matchmaker, registry, and connection table under one owner.
pub struct Lobby {
    matchmaker: Matchmaker,
    registry: SessionRegistry,
    room_config: RoomConfig,
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl Lobby {
    pub fn new(room_config: RoomConfig) -> Self {
        Self {
            matchmaker: Matchmaker::new(),
            registry: SessionRegistry::new(),
            room_config,
            connections: HashMap::new(),
        }
    }

    /// Register an open connection. The returned route is `None` until the
    /// connection is seated in a room, and goes back to `None` when that
    /// room is torn down.
    pub fn connect(&mut self, conn: ConnectionId, outbox: ConnectionSender) -> Route {
        let (route, rx) = watch::channel(None);
        self.connections.insert(conn, ConnectionEntry { outbox, route });
        tracing::debug!(%conn, connections = self.connections.len(), "connection registered");
        rx
    }

    /// Handle `joinGame` from `conn`.
    ///
    /// The first caller waits; the next one is paired with it. The waiting
    /// player takes slot one and the newcomer slot two.
    ///
    /// # Errors
    /// - [`RallyError::InvariantViolation`] if `conn` (or its peer) was
    ///   never registered
    /// - [`RallyError::Room`] if `conn` is already playing or the room
    ///   could not be set up. Affected players get an `error` event.
    pub async fn join_game(&mut self, conn: ConnectionId) -> Result<(), RallyError> {
        let entry = self
            .connections
            .get(&conn)
            .ok_or_else(|| RallyError::InvariantViolation(format!("{conn} joined without registering")))?;

        if let Some(room_id) = self.registry.room_of(conn) {
            let err = RoomError::AlreadyBound(conn, room_id.clone());
            entry.notify(conn, ServerEvent::error(err.to_string()));
            return Err(err.into());
        }

        match self.matchmaker.enqueue(conn) {
            Pairing::Waiting { room_id } => {
                tracing::debug!(%conn, %room_id, "player waiting");
                entry.notify(conn, ServerEvent::Waiting);
                Ok(())
            }
            Pairing::Paired { room_id, peer } => {
                let result = self.pair(&room_id, peer, conn).await;
                if let Err(e) = &result {
                    tracing::warn!(%room_id, %conn, %peer, error = %e, "pairing failed");
                    self.reject([peer, conn]);
                }
                result
            }
        }
    }

    /// Create the room and seat `first` and `second` in it. A room that
    /// fails to fill is destroyed; a room this call did not create is
    /// never touched.
    async fn pair(
        &mut self,
        room_id: &RoomId,
        first: ConnectionId,
        second: ConnectionId,
    ) -> Result<(), RallyError> {
        let first_outbox = self.outbox_of(first)?;
        let second_outbox = self.outbox_of(second)?;

        let handle = self.registry.create(room_id.clone(), self.room_config.clone())?;
        if let Err(e) = self
            .seat(room_id, &handle, (first, first_outbox), (second, second_outbox))
            .await
        {
            let _ = self.registry.destroy(room_id).await;
            return Err(e);
        }

        tracing::info!(%room_id, player1 = %first, player2 = %second, "players paired");
        Ok(())
    }

    /// Bind `first` then `second`. Routes are set before the second bind
    /// starts the match, so input that follows `roomJoined` always has
    /// somewhere to go.
    async fn seat(
        &mut self,
        room_id: &RoomId,
        handle: &RoomHandle,
        (first, first_outbox): (ConnectionId, ConnectionSender),
        (second, second_outbox): (ConnectionId, ConnectionSender),
    ) -> Result<(), RallyError> {
        for conn in [first, second] {
            if let Some(entry) = self.connections.get(&conn) {
                entry.route.send_replace(Some(handle.clone()));
            }
        }

        self.registry
            .bind(room_id, first, Slot::One, first_outbox)
            .await?;
        self.registry
            .bind(room_id, second, Slot::Two, second_outbox)
            .await?;
        Ok(())
    }

    /// Clear the routes of a failed pairing and tell both players.
    fn reject(&self, players: [ConnectionId; 2]) {
        for conn in players {
            if let Some(entry) = self.connections.get(&conn) {
                entry.route.send_replace(None);
                entry.notify(conn, ServerEvent::error(JOIN_FAILED));
            }
        }
    }

    /// `conn` closed. Leaves the queue if it was waiting, otherwise tears
    /// down its room; the opponent gets `playerDisconnected` and may queue
    /// again.
    pub async fn disconnect(&mut self, conn: ConnectionId) {
        if self.matchmaker.cancel_waiting(conn) {
            tracing::debug!(%conn, "left the queue");
        }

        if let Some(teardown) = self.registry.on_disconnect(conn).await {
            for survivor in &teardown.survivors {
                if let Some(entry) = self.connections.get(survivor) {
                    entry.route.send_replace(None);
                }
            }
            tracing::info!(
                room_id = %teardown.room_id,
                %conn,
                survivors = teardown.survivors.len(),
                "room closed after disconnect"
            );
        }

        self.connections.remove(&conn);
    }

    fn outbox_of(&self, conn: ConnectionId) -> Result<ConnectionSender, RallyError> {
        self.connections
            .get(&conn)
            .map(|entry| entry.outbox.clone())
            .ok_or_else(|| RallyError::InvariantViolation(format!("{conn} is not registered")))
    }

    /// The connection currently queued, if any.
    pub fn waiting(&self) -> Option<ConnectionId> {
        self.matchmaker.waiting()
    }

    pub fn room_of(&self, conn: ConnectionId) -> Option<&RoomId> {
        self.registry.room_of(conn)
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&RoomHandle> {
        self.registry.get(room_id)
    }

    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
