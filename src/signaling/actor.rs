use tokio::sync::mpsc;
use tracing::{info, warn};

use super::messages::{ClientMessage, ServerMessage};
use super::registry::Registry;
use super::types::{ChannelId, OutboundMessage, SignalingError};

/// Commands sent to the router actor
pub(crate) enum RouterCommand {
    Dispatch {
        channel_id: ChannelId,
        /// Sender's own outbound queue, for registration and for
        /// reporting routing failures back to the sender.
        reply_tx: mpsc::UnboundedSender<OutboundMessage>,
        message: ClientMessage,
    },
    Disconnect {
        channel_id: ChannelId,
    },
}

/// Single task owning the registry. All mutation and routing is
/// serialized here; connection tasks only queue commands, so a stalled
/// recipient never blocks another channel's traffic.
pub(crate) async fn router_actor(mut rx: mpsc::Receiver<RouterCommand>) {
    let mut registry = Registry::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RouterCommand::Dispatch {
                channel_id,
                reply_tx,
                message,
            } => {
                route_message(&mut registry, channel_id, &reply_tx, message);
            }

            RouterCommand::Disconnect { channel_id } => {
                if let Some(name) = registry.unregister(channel_id) {
                    info!("Participant {} left (channel {})", name, channel_id);
                    broadcast_roster(&registry);
                }
            }
        }
    }
}

fn route_message(
    registry: &mut Registry,
    channel_id: ChannelId,
    reply_tx: &mpsc::UnboundedSender<OutboundMessage>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Join { name } => {
            registry.register(name.clone(), channel_id, reply_tx.clone());
            info!("Participant {} joined on channel {}", name, channel_id);
            broadcast_roster(registry);
        }

        ClientMessage::Offer { from, to, sdp } => {
            let forwarded = ServerMessage::Offer {
                from,
                to: to.clone(),
                sdp,
            };
            deliver_or_report(registry, &to, &forwarded, reply_tx);
        }

        // The answer travels back to the original caller, so the
        // recipient is `from`, not `to`.
        ClientMessage::Answer { from, to, sdp } => {
            let forwarded = ServerMessage::Answer {
                from: from.clone(),
                to,
                sdp,
            };
            deliver_or_report(registry, &from, &forwarded, reply_tx);
        }

        ClientMessage::IceCandidate {
            from,
            to,
            candidate,
        } => {
            let forwarded = ServerMessage::IceCandidate {
                from,
                to: to.clone(),
                candidate,
            };
            deliver_or_report(registry, &to, &forwarded, reply_tx);
        }

        ClientMessage::EndCall { from, to } => {
            let forwarded = ServerMessage::EndCall {
                from,
                to: to.clone(),
            };
            deliver_or_report(registry, &to, &forwarded, reply_tx);
        }

        ClientMessage::CallEnded { participants } => {
            let forwarded = ServerMessage::CallEnded {
                participants: participants.clone(),
            };
            for name in &participants {
                deliver_or_report(registry, name, &forwarded, reply_tx);
            }
        }
    }
}

/// Forward `message` to `recipient`, reporting any failure back to the
/// sender. A recipient whose channel died between lookup and send is
/// eagerly unregistered so the roster stops advertising it.
fn deliver_or_report(
    registry: &mut Registry,
    recipient: &str,
    message: &ServerMessage,
    reply_tx: &mpsc::UnboundedSender<OutboundMessage>,
) {
    match deliver(registry, recipient, message) {
        Ok(()) => {}
        Err(err) => {
            warn!("Routing failure for {}: {}", recipient, err);
            if matches!(err, SignalingError::ChannelClosed(_)) {
                broadcast_roster(registry);
            }
            let failure = ServerMessage::RoutingFailure {
                to: recipient.to_string(),
                reason: err.to_string(),
            };
            let _ = reply_tx.send(encode(&failure));
        }
    }
}

fn deliver(
    registry: &mut Registry,
    recipient: &str,
    message: &ServerMessage,
) -> Result<(), SignalingError> {
    let entry = registry.lookup(recipient)?;
    let channel_id = entry.channel_id;

    if entry.tx.send(encode(message)).is_err() {
        registry.unregister(channel_id);
        return Err(SignalingError::ChannelClosed(recipient.to_string()));
    }
    Ok(())
}

fn broadcast_roster(registry: &Registry) {
    let roster = ServerMessage::Roster {
        participants: registry.snapshot(),
    };
    let msg = encode(&roster);
    for tx in registry.senders() {
        let _ = tx.send(msg.clone());
    }
}

fn encode(message: &ServerMessage) -> OutboundMessage {
    let json =
        serde_json::to_string(message).expect("ServerMessage serialization should never fail");
    OutboundMessage::from(json)
}

/// Handle to communicate with the router actor
#[derive(Clone)]
pub struct RouterHandle {
    pub(crate) tx: mpsc::Sender<RouterCommand>,
}

impl RouterHandle {
    /// Submit an inbound client message for routing
    pub async fn dispatch(
        &self,
        channel_id: ChannelId,
        reply_tx: mpsc::UnboundedSender<OutboundMessage>,
        message: ClientMessage,
    ) {
        let _ = self
            .tx
            .send(RouterCommand::Dispatch {
                channel_id,
                reply_tx,
                message,
            })
            .await;
    }

    /// Deregister the channel after its socket closed
    pub async fn disconnect(&self, channel_id: ChannelId) {
        let _ = self.tx.send(RouterCommand::Disconnect { channel_id }).await;
    }
}
