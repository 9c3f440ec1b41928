//! Room configuration and phase state machine.

use std::fmt;

use rally_sim::CourtConfig;
use rally_tick::TickConfig;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room the registry creates.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomConfig {
    /// Court geometry and match rules.
    pub court: CourtConfig,

    /// Tick rate and scheduling. Defaults to 60 Hz.
    pub tick: TickConfig,

    /// Capacity of the actor's command channel. Input senders wait when
    /// it is full.
    pub channel_size: usize,

    /// Seed for the serve-angle generator. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            court: CourtConfig::default(),
            tick: TickConfig::default(),
            channel_size: 64,
            rng_seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its life.
///
/// ```text
/// Filling ──(2nd bind)──→ Active ──(win)──→ Finished
///                            ↑                  │
///                            └──(both vote)─────┘
///
/// any phase ──(a connection is removed / shutdown)──→ TornDown
/// ```
///
/// - **Filling**: fewer than two connections bound. No ticking.
/// - **Active**: both bound, scheduler running, paddle input accepted.
/// - **Finished**: someone won. Scheduler stopped, restart votes accepted.
/// - **TornDown**: terminal. A match never resumes with one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomPhase {
    Filling,
    Active,
    Finished,
    TornDown,
}

impl RoomPhase {
    /// Whether a connection may still be bound.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Filling)
    }

    /// Whether the simulation is advancing.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Filling, Self::Active)
                | (Self::Active, Self::Finished)
                | (Self::Finished, Self::Active)
                | (Self::Filling | Self::Active | Self::Finished, Self::TornDown)
        )
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filling => write!(f, "Filling"),
            Self::Active => write!(f, "Active"),
            Self::Finished => write!(f, "Finished"),
            Self::TornDown => write!(f, "TornDown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_phase_transitions() {
        assert!(RoomPhase::Filling.can_transition_to(RoomPhase::Active));
        assert!(RoomPhase::Active.can_transition_to(RoomPhase::Finished));
        assert!(RoomPhase::Finished.can_transition_to(RoomPhase::Active));

        assert!(!RoomPhase::Filling.can_transition_to(RoomPhase::Finished));
        assert!(!RoomPhase::Active.can_transition_to(RoomPhase::Filling));
        assert!(!RoomPhase::TornDown.can_transition_to(RoomPhase::Active));
    }

    #[test]
    fn test_every_live_phase_can_be_torn_down() {
        for phase in [RoomPhase::Filling, RoomPhase::Active, RoomPhase::Finished] {
            assert!(phase.can_transition_to(RoomPhase::TornDown), "{phase}");
        }
        assert!(!RoomPhase::TornDown.can_transition_to(RoomPhase::TornDown));
    }

    #[test]
    fn test_room_phase_predicates() {
        assert!(RoomPhase::Filling.is_joinable());
        assert!(!RoomPhase::Active.is_joinable());
        assert!(RoomPhase::Active.is_active());
        assert!(!RoomPhase::Finished.is_active());
    }

    #[test]
    fn test_room_phase_display() {
        assert_eq!(RoomPhase::Filling.to_string(), "Filling");
        assert_eq!(RoomPhase::TornDown.to_string(), "TornDown");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.tick.tick_rate_hz, 60);
        assert_eq!(config.court.win_score, 5);
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.rng_seed, None);
    }
}
