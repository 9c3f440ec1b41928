//! Codec trait and implementations for serializing events.
//!
//! The rest of the server never calls `serde_json` directly; it goes
//! through a [`Codec`], so the wire format is chosen in one place.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts values to bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that speaks JSON text, which is what browser clients send
/// and expect.
///
/// Behind the `json` feature flag (enabled by default).
///
/// ```rust
/// use rally_protocol::{ClientEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let event: ClientEvent = codec.decode(br#"{"event":"joinGame"}"#).unwrap();
/// assert_eq!(event, ClientEvent::JoinGame);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use rally_sim::Direction;

    use super::*;
    use crate::{ClientEvent, ServerEvent};

    #[test]
    fn test_encode_produces_utf8_json() {
        let bytes = JsonCodec.encode(&ServerEvent::Waiting).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert_eq!(text, r#"{"event":"waiting"}"#);
    }

    #[test]
    fn test_decode_paddle_move() {
        let event: ClientEvent = JsonCodec
            .decode(br#"{"event":"paddleMove","data":{"dir":"down"}}"#)
            .unwrap();
        assert_eq!(event, ClientEvent::PaddleMove { dir: Direction::Down });
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_event_is_decode_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(br#"{"event":"cheat"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
