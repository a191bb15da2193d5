use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Signaling relay errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("channel closed for participant: {0}")]
    ChannelClosed(String),
}

const CHANNEL_ID_LEN: usize = 13;
const HEX_CHARS: &[u8] = b"0123456789abcdef";

/// Channel ID: 13-byte fixed array ("chan_" + 8 hex)
///
/// Identifies one live WebSocket connection. Owned by the transport
/// layer; the registry only references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    bytes: [u8; CHANNEL_ID_LEN],
    len: u8,
}

impl ChannelId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; CHANNEL_ID_LEN];
        bytes[..5].copy_from_slice(b"chan_");

        let mut rng = rand::rng();
        let value: u32 = rng.random();

        for i in 0..8 {
            let nibble = ((value >> (28 - i * 4)) & 0xF) as usize;
            bytes[5 + i] = HEX_CHARS[nibble];
        }
        Self {
            bytes,
            len: CHANNEL_ID_LEN as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        let mut bytes = [0u8; CHANNEL_ID_LEN];
        let src = s.as_bytes();
        let len = src.len().min(CHANNEL_ID_LEN);
        bytes[..len].copy_from_slice(&src[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }
}

impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <&str>::deserialize(deserializer)?;
        Ok(ChannelId::from(s))
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Create a new outbound message from any string type
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

/// One registered participant: the channel it is reachable on and the
/// sender for its outbound message queue.
///
/// The sender carries OutboundMessage (shared bytes) so broadcast
/// cloning is O(1).
#[derive(Debug)]
pub(crate) struct ParticipantEntry {
    pub channel_id: ChannelId,
    pub tx: mpsc::UnboundedSender<OutboundMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_generate_has_correct_format() {
        let id = ChannelId::generate();
        assert!(id.as_str().starts_with("chan_"));
        assert_eq!(id.as_str().len(), 13);
    }

    #[test]
    fn channel_id_generate_uses_hex_suffix() {
        let id = ChannelId::generate();
        for c in id.as_str()[5..].chars() {
            assert!(c.is_ascii_hexdigit(), "Invalid char: {}", c);
        }
    }

    #[test]
    fn channel_id_from_str() {
        let id = ChannelId::from("chan_12345678");
        assert_eq!(id.as_str(), "chan_12345678");
    }

    #[test]
    fn channel_id_display() {
        let id = ChannelId::from("chan_abcd1234");
        assert_eq!(format!("{}", id), "chan_abcd1234");
    }

    #[test]
    fn channel_id_serialization() {
        let id = ChannelId::from("chan_test1234");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"chan_test1234\"");
    }

    #[test]
    fn channel_id_deserialization() {
        let id: ChannelId = serde_json::from_str("\"chan_test1234\"").unwrap();
        assert_eq!(id.as_str(), "chan_test1234");
    }

    #[test]
    fn channel_id_is_copy() {
        let id = ChannelId::generate();
        let copy = id;
        assert_eq!(id.as_str(), copy.as_str());
    }

    #[test]
    fn outbound_message_roundtrip() {
        let msg = OutboundMessage::new("hello");
        assert_eq!(msg.into_inner().as_str(), "hello");
    }
}
