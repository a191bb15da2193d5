use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from client to relay
///
/// `sdp` and `candidate` payloads are opaque to the relay; they are
/// carried as raw JSON values and forwarded unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Register a display name for this channel
    #[serde(rename = "join")]
    Join { name: String },

    /// Session-description offer for `to`
    #[serde(rename = "offer")]
    Offer { from: String, to: String, sdp: Value },

    /// Session-description answer, routed back to the original caller
    #[serde(rename = "answer")]
    Answer { from: String, to: String, sdp: Value },

    /// Connectivity candidate for `to`
    #[serde(rename = "ice_candidate")]
    IceCandidate {
        from: String,
        to: String,
        candidate: Value,
    },

    /// Informational call-is-live notice for `to`; terminates nothing
    #[serde(rename = "end_call")]
    EndCall { from: String, to: String },

    /// Terminate the call for both named participants
    #[serde(rename = "call_ended")]
    CallEnded { participants: [String; 2] },
}

/// Messages sent from relay to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full set of registered names, broadcast after every join/leave
    #[serde(rename = "roster")]
    Roster { participants: Vec<String> },

    /// Forwarded offer
    #[serde(rename = "offer")]
    Offer { from: String, to: String, sdp: Value },

    /// Forwarded answer (delivered to the original caller)
    #[serde(rename = "answer")]
    Answer { from: String, to: String, sdp: Value },

    /// Forwarded connectivity candidate
    #[serde(rename = "ice_candidate")]
    IceCandidate {
        from: String,
        to: String,
        candidate: Value,
    },

    /// Forwarded call-is-live notice
    #[serde(rename = "end_call")]
    EndCall { from: String, to: String },

    /// Call terminated, fanned out to both participants
    #[serde(rename = "call_ended")]
    CallEnded { participants: [String; 2] },

    /// Delivery failure, reported back to the sender
    #[serde(rename = "routing_failure")]
    RoutingFailure { to: String, reason: String },

    /// Malformed inbound frame
    #[serde(rename = "error")]
    Error { message: String },
}
