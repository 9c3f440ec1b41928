//! Session registry: creates, tracks, and tears down rooms.

use std::collections::HashMap;

use rally_protocol::RoomId;
use rally_transport::ConnectionId;

use crate::room::spawn_room;
use crate::{ConnectionSender, RoomConfig, RoomError, RoomHandle, Slot};

/// What [`SessionRegistry::on_disconnect`] tore down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teardown {
    pub room_id: RoomId,
    /// Connections that were still bound when the room went away. They
    /// have been told `playerDisconnected` and are free to queue again.
    pub survivors: Vec<ConnectionId>,
}

/// Owns every live room and knows which room each connection plays in.
///
/// Not thread-safe by itself: the server keeps it inside the lobby mutex,
/// which is what orders session creation against teardown.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    rooms: HashMap<RoomId, RoomHandle>,

    /// Each connection is bound to at most one room.
    connections: HashMap<ConnectionId, RoomId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a room under `room_id`.
    ///
    /// # Errors
    /// [`RoomError::DuplicateRoom`] if the id is already registered.
    pub fn create(&mut self, room_id: RoomId, config: RoomConfig) -> Result<RoomHandle, RoomError> {
        if self.rooms.contains_key(&room_id) {
            return Err(RoomError::DuplicateRoom(room_id));
        }
        let handle = spawn_room(room_id.clone(), config);
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, "room created");
        Ok(handle)
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&RoomHandle> {
        self.rooms.get(room_id)
    }

    /// Bind `conn` to `slot` of `room_id` and index it.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] for an unknown room
    /// - [`RoomError::AlreadyBound`] if `conn` plays in another room
    /// - anything [`RoomHandle::add_connection`] returns
    pub async fn bind(
        &mut self,
        room_id: &RoomId,
        conn: ConnectionId,
        slot: Slot,
        outbox: ConnectionSender,
    ) -> Result<(), RoomError> {
        if let Some(current) = self.connections.get(&conn) {
            if current != room_id {
                return Err(RoomError::AlreadyBound(conn, current.clone()));
            }
        }
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        handle.add_connection(conn, slot, outbox).await?;
        self.connections.insert(conn, room_id.clone());
        Ok(())
    }

    /// Stop a room and forget it along with every connection bound to it.
    ///
    /// Waits for the actor to acknowledge, so no tick runs after this
    /// returns.
    pub async fn destroy(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        self.connections.retain(|_, rid| rid != room_id);

        // An actor that already stopped has nothing left to cancel.
        if let Err(e) = handle.shutdown().await {
            tracing::debug!(%room_id, error = %e, "room already stopped");
        }
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// A connection went away. If it was playing, remove it from its room
    /// and tear the room down; the survivor is notified by the room.
    ///
    /// Returns `None` for connections that weren't bound anywhere.
    pub async fn on_disconnect(&mut self, conn: ConnectionId) -> Option<Teardown> {
        let room_id = self.connections.remove(&conn)?;

        let survivors = match self.rooms.get(&room_id) {
            Some(handle) => match handle.remove_connection(conn).await {
                Ok(remaining) => remaining,
                Err(e) => {
                    tracing::warn!(%room_id, %conn, error = %e, "room did not answer removal");
                    self.bound_to(&room_id)
                }
            },
            None => {
                tracing::warn!(%room_id, %conn, "index pointed at a missing room");
                self.bound_to(&room_id)
            }
        };

        if self.rooms.contains_key(&room_id) {
            // Just checked, so this can't be NotFound.
            let _ = self.destroy(&room_id).await;
        } else {
            self.connections.retain(|_, rid| *rid != room_id);
        }

        Some(Teardown { room_id, survivors })
    }

    /// The room `conn` is bound to, if any.
    pub fn room_of(&self, conn: ConnectionId) -> Option<&RoomId> {
        self.connections.get(&conn)
    }

    pub fn session_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    fn bound_to(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, rid)| *rid == room_id)
            .map(|(conn, _)| *conn)
            .collect()
    }
}
