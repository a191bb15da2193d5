//! Client-side call-state machine.
//!
//! Wraps exactly one connection-negotiation primitive per active call
//! and turns inbound relay messages into state transitions plus the
//! outbound messages the relay expects next. The primitive itself
//! (RTCPeerConnection or equivalent) is platform-supplied and reached
//! through the [`PeerConnection`] trait; the factory handed to
//! [`CallSession::new`] must produce primitives already wired with the
//! local media tracks.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::signaling::{ClientMessage, ServerMessage};

/// Lifecycle of one call instance. `Ended` is terminal; a new call
/// starts over from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Offering,
    Answered,
    Ended,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot start a call while {0:?}")]
    InvalidState(CallState),

    #[error("negotiation failed: {0}")]
    Negotiation(String),
}

/// Platform connection-negotiation primitive, one per active call.
///
/// SDP and candidate payloads stay opaque JSON values end to end.
pub trait PeerConnection {
    /// Create the local offer and install it as the local description.
    fn create_offer(&mut self) -> Result<Value, SessionError>;

    /// Install the remote offer and produce the local answer.
    fn create_answer(&mut self, remote_sdp: &Value) -> Result<Value, SessionError>;

    /// Install the remote answer.
    fn set_remote_description(&mut self, sdp: &Value) -> Result<(), SessionError>;

    fn add_ice_candidate(&mut self, candidate: &Value) -> Result<(), SessionError>;

    fn close(&mut self);
}

/// Driver for one participant's calls.
///
/// Owns the negotiation primitive for the current call and recreates it
/// per call; there is no shared or global connection state.
pub struct CallSession<P: PeerConnection> {
    local_name: String,
    factory: Box<dyn FnMut() -> P>,
    pc: Option<P>,
    state: CallState,
    /// (caller, callee) of the negotiation in flight.
    call: Option<(String, String)>,
    remote_description_set: bool,
    /// Candidates that raced ahead of the remote description.
    pending_candidates: Vec<Value>,
    observer: Option<Box<dyn FnMut(CallState)>>,
}

impl<P: PeerConnection> CallSession<P> {
    pub fn new(local_name: impl Into<String>, factory: impl FnMut() -> P + 'static) -> Self {
        Self {
            local_name: local_name.into(),
            factory: Box::new(factory),
            pc: None,
            state: CallState::Idle,
            call: None,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            observer: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// (caller, callee) of the active negotiation, if any.
    pub fn call_context(&self) -> Option<(&str, &str)> {
        self.call
            .as_ref()
            .map(|(caller, callee)| (caller.as_str(), callee.as_str()))
    }

    /// Register a UI observer invoked on every state transition, e.g.
    /// to show or hide the end-call control.
    pub fn set_state_observer(&mut self, observer: impl FnMut(CallState) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Initiate a call to `callee`: fresh primitive, local offer, state
    /// `Offering`. Returns the offer to send to the relay.
    pub fn start_call(&mut self, callee: &str) -> Result<ClientMessage, SessionError> {
        match self.state {
            CallState::Idle | CallState::Ended => {}
            busy => return Err(SessionError::InvalidState(busy)),
        }

        let mut pc = (self.factory)();
        let sdp = pc.create_offer()?;
        self.pc = Some(pc);
        self.remote_description_set = false;
        self.pending_candidates.clear();
        self.call = Some((self.local_name.clone(), callee.to_string()));
        self.set_state(CallState::Offering);

        Ok(ClientMessage::Offer {
            from: self.local_name.clone(),
            to: callee.to_string(),
            sdp,
        })
    }

    /// Tear down the active call locally and tell the relay to fan the
    /// termination out to both parties.
    pub fn hang_up(&mut self) -> Option<ClientMessage> {
        let (caller, callee) = self.call.clone()?;
        self.end_locally();
        Some(ClientMessage::CallEnded {
            participants: [caller, callee],
        })
    }

    /// Leave the terminal `Ended` state so a new call can start.
    pub fn reset(&mut self) {
        self.end_locally();
        self.set_state(CallState::Idle);
    }

    /// Feed one relay message through the state machine. Returns the
    /// messages to send back to the relay in response.
    pub fn handle_message(
        &mut self,
        message: &ServerMessage,
    ) -> Result<Vec<ClientMessage>, SessionError> {
        match message {
            ServerMessage::Offer { from, to, sdp } => self.on_offer(from, to, sdp),
            ServerMessage::Answer { from, to, sdp } => self.on_answer(from, to, sdp),
            ServerMessage::IceCandidate { candidate, .. } => {
                self.on_candidate(candidate)?;
                Ok(Vec::new())
            }
            ServerMessage::EndCall { from, .. } => {
                // Informational call-is-live notice; re-notify the
                // observer so the UI can surface the end-call control.
                debug!("Call-live notice from {}", from);
                self.notify_observer();
                Ok(Vec::new())
            }
            ServerMessage::CallEnded { participants } => {
                if self.involves_local(participants) {
                    self.end_locally();
                }
                Ok(Vec::new())
            }
            ServerMessage::Roster { participants } => {
                self.on_roster(participants);
                Ok(Vec::new())
            }
            ServerMessage::RoutingFailure { to, reason } => {
                warn!("Routing failure for {}: {}", to, reason);
                if self.state == CallState::Offering {
                    self.end_locally();
                }
                Ok(Vec::new())
            }
            ServerMessage::Error { message } => {
                warn!("Relay rejected a message: {}", message);
                Ok(Vec::new())
            }
        }
    }

    fn on_offer(
        &mut self,
        from: &str,
        to: &str,
        sdp: &Value,
    ) -> Result<Vec<ClientMessage>, SessionError> {
        if to != self.local_name {
            debug!("Ignoring offer addressed to {}", to);
            return Ok(Vec::new());
        }

        // Offer glare: a new negotiation arrived while a call was
        // active. The old primitive must be closed, not dropped, or
        // its media capture would outlive the call.
        if let Some(mut old) = self.pc.take() {
            debug!("Replacing active call with new offer from {}", from);
            old.close();
            self.pending_candidates.clear();
            self.remote_description_set = false;
        }

        let mut pc = (self.factory)();
        let answer = pc.create_answer(sdp)?;
        self.pc = Some(pc);
        self.remote_description_set = true;
        self.drain_pending_candidates()?;
        self.call = Some((from.to_string(), to.to_string()));
        self.set_state(CallState::Answered);

        Ok(vec![ClientMessage::Answer {
            from: from.to_string(),
            to: to.to_string(),
            sdp: answer,
        }])
    }

    fn on_answer(
        &mut self,
        from: &str,
        to: &str,
        sdp: &Value,
    ) -> Result<Vec<ClientMessage>, SessionError> {
        if self.state != CallState::Offering {
            debug!("Ignoring answer while {:?}", self.state);
            return Ok(Vec::new());
        }

        let pc = self
            .pc
            .as_mut()
            .ok_or_else(|| SessionError::Negotiation("no active primitive".to_string()))?;
        pc.set_remote_description(sdp)?;
        self.remote_description_set = true;
        self.drain_pending_candidates()?;
        self.set_state(CallState::Answered);

        // Tell the callee the call is live (informational, terminates
        // nothing).
        Ok(vec![ClientMessage::EndCall {
            from: from.to_string(),
            to: to.to_string(),
        }])
    }

    fn on_candidate(&mut self, candidate: &Value) -> Result<(), SessionError> {
        match self.pc.as_mut() {
            Some(pc) if self.remote_description_set => pc.add_ice_candidate(candidate),
            // Candidate raced ahead of the remote description; hold it
            // until the description lands.
            _ => {
                self.pending_candidates.push(candidate.clone());
                Ok(())
            }
        }
    }

    fn on_roster(&mut self, participants: &[String]) {
        let in_call = matches!(self.state, CallState::Offering | CallState::Answered);
        if !in_call {
            return;
        }
        if let Some(remote) = self.remote_party()
            && !participants.iter().any(|name| name == remote)
        {
            // The remote side disconnected; its registration is gone,
            // so the call cannot continue.
            let remote = remote.to_string();
            warn!("Remote party {} left, ending call", remote);
            self.end_locally();
        }
    }

    fn remote_party(&self) -> Option<&str> {
        let (caller, callee) = self.call.as_ref()?;
        if caller == &self.local_name {
            Some(callee.as_str())
        } else {
            Some(caller.as_str())
        }
    }

    fn involves_local(&self, participants: &[String; 2]) -> bool {
        if participants.iter().any(|name| name == &self.local_name) {
            return true;
        }
        match self.call.as_ref() {
            Some((caller, callee)) => participants
                .iter()
                .any(|name| name == caller || name == callee),
            None => false,
        }
    }

    fn drain_pending_candidates(&mut self) -> Result<(), SessionError> {
        if let Some(pc) = self.pc.as_mut() {
            for candidate in self.pending_candidates.drain(..) {
                pc.add_ice_candidate(&candidate)?;
            }
        }
        Ok(())
    }

    fn end_locally(&mut self) {
        if let Some(mut pc) = self.pc.take() {
            pc.close();
        }
        self.call = None;
        self.remote_description_set = false;
        self.pending_candidates.clear();
        if self.state != CallState::Ended {
            self.set_state(CallState::Ended);
        }
    }

    fn set_state(&mut self, state: CallState) {
        self.state = state;
        self.notify_observer();
    }

    fn notify_observer(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer(self.state);
        }
    }
}
