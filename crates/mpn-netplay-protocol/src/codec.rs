//! Wire encoding for directory payloads.
//!
//! The lobby client hands the raw response body to a [`Codec`] and gets a
//! [`LobbyListing`](crate::LobbyListing) back. The session directory only
//! speaks JSON, so [`JsonCodec`] is the one implementation shipped here.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ProtocolError;

/// Turns wire types into bytes and back.
///
/// Implementors must be `Send + Sync + 'static`: the lobby browser actor
/// keeps its codec for as long as the task runs.
pub trait Codec: Send + Sync + 'static {
    /// Encodes `value` into an owned buffer.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Decodes a complete payload. Trailing garbage or a truncated body is
    /// an error, never a partial value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// `serde_json` backed [`Codec`], available with the default `json` feature.
///
/// ```rust
/// use mpn_netplay_protocol::{Codec, JsonCodec, LobbyListing};
///
/// let listing: LobbyListing = JsonCodec
///     .decode(br#"{"status":"OK","sessions":[]}"#)
///     .unwrap();
/// assert!(listing.is_ok() && listing.sessions.is_empty());
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
    use super::*;
    use crate::{ChatMessage, LobbyListing};

    #[test]
    fn test_decode_truncated_body_returns_decode_error() {
        let err = JsonCodec
            .decode::<LobbyListing>(br#"{"status":"OK","sess"#)
            .unwrap_err();

        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_sessions_not_array_returns_decode_error() {
        let err = JsonCodec
            .decode::<LobbyListing>(br#"{"status":"OK","sessions":7}"#)
            .unwrap_err();

        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_encode_chat_message_keeps_wire_names() {
        let bytes = JsonCodec
            .encode(&ChatMessage::new("Alice", "hi", "12:00:00"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["sender"], "Alice");
        assert_eq!(value["text"], "hi");
        assert_eq!(value["timestamp"], "12:00:00");
    }
}
