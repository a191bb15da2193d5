//! Switchboard: a signaling relay for two-party WebRTC calls.
//!
//! The relay brokers the small control messages (session descriptions,
//! ICE candidates, call termination) two clients need to negotiate a
//! direct media connection; it never sees media itself. The `session`
//! module provides the matching client-side call-state machine.

pub mod session;
pub mod signaling;
