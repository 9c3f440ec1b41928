//! Server configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use rally_room::RoomConfig;
use rally_sim::CourtConfig;
use rally_tick::TickConfig;

/// Process-level settings for `rally-server`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Simulation ticks per second for every room.
    pub tick_rate_hz: u32,
    /// Points needed to win a match.
    pub win_score: u32,
    /// Events buffered per connection before the room starts dropping
    /// them for that connection.
    pub outbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            tick_rate_hz: 60,
            win_score: 5,
            outbox_capacity: 256,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | variable          | meaning                                   |
    /// |-------------------|-------------------------------------------|
    /// | `PORT`            | listen on `0.0.0.0:$PORT` (wins over `RALLY_ADDR`) |
    /// | `RALLY_ADDR`      | full bind address, default `0.0.0.0:3000` |
    /// | `RALLY_LOG`       | log filter, default `info`                |
    /// | `RALLY_TICK_HZ`   | tick rate, default `60`                   |
    /// | `RALLY_WIN_SCORE` | points to win, default `5`                |
    /// | `RALLY_OUTBOX`    | per-connection outbox capacity, default `256` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match (lookup("PORT"), lookup("RALLY_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{port}"),
            (None, Some(addr)) => addr,
            (None, None) => defaults.bind_addr.to_string(),
        };
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(bind_addr))?;

        let config = Self {
            bind_addr,
            log_level: lookup("RALLY_LOG").unwrap_or(defaults.log_level),
            tick_rate_hz: parse_or(&lookup, "RALLY_TICK_HZ", defaults.tick_rate_hz)?,
            win_score: parse_or(&lookup, "RALLY_WIN_SCORE", defaults.win_score)?,
            outbox_capacity: parse_or(&lookup, "RALLY_OUTBOX", defaults.outbox_capacity)?,
        };

        if config.tick_rate_hz == 0 {
            return Err(ConfigError::OutOfRange("RALLY_TICK_HZ"));
        }
        if config.win_score == 0 {
            return Err(ConfigError::OutOfRange("RALLY_WIN_SCORE"));
        }
        if config.outbox_capacity == 0 {
            return Err(ConfigError::OutOfRange("RALLY_OUTBOX"));
        }
        Ok(config)
    }

    /// Room settings derived from this config.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            court: CourtConfig {
                win_score: self.win_score,
                ..CourtConfig::default()
            },
            tick: TickConfig::with_rate(self.tick_rate_hz),
            ..RoomConfig::default()
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    OutOfRange(&'static str),
}
