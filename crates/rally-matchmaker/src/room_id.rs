//! Room id generation.

use std::time::{SystemTime, UNIX_EPOCH};

use rally_protocol::RoomId;
use rand::Rng;

/// Produces ids of the form `room_<unix millis>_<sequence>_<random hex>`.
///
/// The sequence number alone makes ids unique within a process; the
/// timestamp and random suffix keep them unique across restarts and make
/// them unguessable enough to paste into logs.
#[derive(Debug, Default)]
pub struct RoomIdGenerator {
    seq: u64,
}

impl RoomIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> RoomId {
        self.seq += 1;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let suffix: u32 = rand::rng().random();
        RoomId::new(format!("room_{millis}_{}_{suffix:08x}", self.seq))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_id_format() {
        let id = RoomIdGenerator::new().next_id();
        let parts: Vec<&str> = id.as_str().split('_').collect();

        assert_eq!(parts.len(), 4, "unexpected id {id}");
        assert_eq!(parts[0], "room");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2], "1");
        assert_eq!(parts[3].len(), 8);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids = RoomIdGenerator::new();
        let seen: HashSet<RoomId> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
    }
}
