//! WebSocket signaling relay for two-party call negotiation

mod actor;
mod messages;
mod registry;
mod server;
mod types;

pub use actor::RouterHandle;
pub use messages::{ClientMessage, ServerMessage};
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use types::{ChannelId, OutboundMessage, SignalingError};
