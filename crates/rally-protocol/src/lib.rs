//! Wire protocol for Rally.
//!
//! This crate defines what travels between a browser client and the
//! server:
//!
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): one JSON object per
//!   WebSocket frame, shaped `{"event": "<name>", "data": <payload>}`.
//! - **Identity** ([`RoomId`]) and addressing ([`Recipient`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent / ServerEvent) → Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientEvent, Recipient, RoomId, ServerEvent, VOTES_NEEDED};
