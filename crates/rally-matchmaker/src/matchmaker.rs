//! The single-slot matchmaker.

use rally_protocol::RoomId;
use rally_transport::ConnectionId;

use crate::RoomIdGenerator;

/// Result of [`Matchmaker::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    /// The caller is now the waiting connection. `room_id` is reserved
    /// for the match it will eventually play.
    Waiting { room_id: RoomId },

    /// The caller was paired with `peer`, who had been waiting.
    /// `peer` takes player 1, the caller player 2.
    Paired { room_id: RoomId, peer: ConnectionId },
}

impl Pairing {
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Waiting { room_id } | Self::Paired { room_id, .. } => room_id,
        }
    }
}

/// Holds at most one waiting connection and pairs it with the next one.
#[derive(Debug, Default)]
pub struct Matchmaker {
    slot: Option<(ConnectionId, RoomId)>,
    ids: RoomIdGenerator,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `conn` for a match.
    ///
    /// With nobody waiting, `conn` takes the slot under a freshly reserved
    /// room id. Otherwise the waiting connection is paired with `conn` and
    /// the slot is emptied in the same call. A connection that is already
    /// the one waiting stays waiting; it is never paired with itself.
    pub fn enqueue(&mut self, conn: ConnectionId) -> Pairing {
        match self.slot.take() {
            Some((waiting, room_id)) if waiting == conn => {
                tracing::debug!(%conn, %room_id, "already waiting");
                self.slot = Some((waiting, room_id.clone()));
                Pairing::Waiting { room_id }
            }
            Some((peer, room_id)) => {
                tracing::info!(%room_id, player1 = %peer, player2 = %conn, "paired");
                Pairing::Paired { room_id, peer }
            }
            None => {
                let room_id = self.ids.next_id();
                tracing::info!(%conn, %room_id, "waiting for opponent");
                self.slot = Some((conn, room_id.clone()));
                Pairing::Waiting { room_id }
            }
        }
    }

    /// Remove `conn` from the slot if it is the one waiting.
    ///
    /// Returns whether anything was removed. The reserved room id is
    /// discarded.
    pub fn cancel_waiting(&mut self, conn: ConnectionId) -> bool {
        match &self.slot {
            Some((waiting, room_id)) if *waiting == conn => {
                tracing::debug!(%conn, %room_id, "left the queue");
                self.slot = None;
                true
            }
            _ => false,
        }
    }

    /// The connection currently waiting, if any.
    pub fn waiting(&self) -> Option<ConnectionId> {
        self.slot.as_ref().map(|(conn, _)| *conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_first_arrival_waits() {
        let mut mm = Matchmaker::new();
        let pairing = mm.enqueue(conn(1));

        assert!(matches!(pairing, Pairing::Waiting { .. }));
        assert_eq!(mm.waiting(), Some(conn(1)));
    }

    #[test]
    fn test_second_arrival_pairs_into_reserved_room() {
        let mut mm = Matchmaker::new();
        let Pairing::Waiting { room_id } = mm.enqueue(conn(1)) else {
            panic!("expected Waiting");
        };

        let pairing = mm.enqueue(conn(2));

        assert_eq!(
            pairing,
            Pairing::Paired {
                room_id,
                peer: conn(1)
            }
        );
        assert_eq!(mm.waiting(), None);
    }

    #[test]
    fn test_three_arrivals() {
        let mut mm = Matchmaker::new();
        let first = mm.enqueue(conn(1));
        let second = mm.enqueue(conn(2));
        let third = mm.enqueue(conn(3));

        assert_eq!(first.room_id(), second.room_id());
        assert!(matches!(second, Pairing::Paired { peer, .. } if peer == conn(1)));
        assert!(matches!(third, Pairing::Waiting { .. }));
        assert_ne!(third.room_id(), first.room_id(), "C waits in a new room");
        assert_eq!(mm.waiting(), Some(conn(3)));
    }

    #[test]
    fn test_reenqueue_while_waiting_keeps_room() {
        let mut mm = Matchmaker::new();
        let first = mm.enqueue(conn(1));
        let again = mm.enqueue(conn(1));

        assert_eq!(first, again);
        assert_eq!(mm.waiting(), Some(conn(1)));
    }

    #[test]
    fn test_cancel_waiting() {
        let mut mm = Matchmaker::new();
        mm.enqueue(conn(1));

        assert!(!mm.cancel_waiting(conn(2)), "not the waiting connection");
        assert_eq!(mm.waiting(), Some(conn(1)));

        assert!(mm.cancel_waiting(conn(1)));
        assert_eq!(mm.waiting(), None);
        assert!(!mm.cancel_waiting(conn(1)));

        // The next arrival waits instead of pairing with a ghost.
        assert!(matches!(mm.enqueue(conn(2)), Pairing::Waiting { .. }));
    }
}
