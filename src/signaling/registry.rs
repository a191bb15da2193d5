use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::warn;

use super::types::{ChannelId, OutboundMessage, ParticipantEntry, SignalingError};

/// Registry of connected participants: display name -> live channel.
///
/// Pure bookkeeping, no I/O. Roster broadcasts after mutation are the
/// router's job, so every method here stays synchronous and side-effect
/// free apart from the map itself.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    participants: HashMap<String, ParticipantEntry>,
    /// Reverse index so a disconnect can deregister by channel id alone.
    channels: HashMap<ChannelId, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the mapping for `name`.
    ///
    /// A name already mapped to a different live channel is overwritten
    /// (last-write-wins, treated as reconnect-by-name) and the stale
    /// reverse entry dropped.
    pub fn register(
        &mut self,
        name: String,
        channel_id: ChannelId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) {
        if let Some(old) = self
            .participants
            .insert(name.clone(), ParticipantEntry { channel_id, tx })
        {
            warn!(
                "Duplicate registration for {}: {} replaces {}",
                name, channel_id, old.channel_id
            );
            self.channels.remove(&old.channel_id);
        }
        self.channels.insert(channel_id, name);
    }

    /// Remove the mapping owned by `channel_id`, returning the name it
    /// carried. A name re-registered from a newer channel is untouched
    /// by the old channel's disconnect.
    pub fn unregister(&mut self, channel_id: ChannelId) -> Option<String> {
        let name = self.channels.remove(&channel_id)?;
        if self
            .participants
            .get(&name)
            .is_some_and(|entry| entry.channel_id == channel_id)
        {
            self.participants.remove(&name);
        }
        Some(name)
    }

    /// Resolve a display name to its participant entry.
    pub fn lookup(&self, name: &str) -> Result<&ParticipantEntry, SignalingError> {
        self.participants
            .get(name)
            .ok_or_else(|| SignalingError::UnknownParticipant(name.to_string()))
    }

    /// All currently registered display names. No ordering guarantee;
    /// consumers treat this as a set.
    pub fn snapshot(&self) -> Vec<String> {
        self.participants.keys().cloned().collect()
    }

    /// Iterate all live outbound senders, for roster broadcasts.
    pub fn senders(&self) -> impl Iterator<Item = &mpsc::UnboundedSender<OutboundMessage>> {
        self.participants.values().map(|entry| &entry.tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> (
        mpsc::UnboundedSender<OutboundMessage>,
        mpsc::UnboundedReceiver<OutboundMessage>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn lookup_returns_registered_channel() {
        let mut registry = Registry::new();
        let id = ChannelId::from("chan_00000001");
        let (tx, _rx) = entry();

        registry.register("alice".to_string(), id, tx);

        assert_eq!(registry.lookup("alice").unwrap().channel_id, id);
    }

    #[test]
    fn lookup_unknown_name_fails() {
        let registry = Registry::new();
        let err = registry.lookup("nobody").unwrap_err();
        assert!(matches!(err, SignalingError::UnknownParticipant(_)));
    }

    #[test]
    fn reregistration_is_last_write_wins() {
        let mut registry = Registry::new();
        let first = ChannelId::from("chan_00000001");
        let second = ChannelId::from("chan_00000002");
        let (tx1, _rx1) = entry();
        let (tx2, _rx2) = entry();

        registry.register("alice".to_string(), first, tx1);
        registry.register("alice".to_string(), second, tx2);

        assert_eq!(registry.lookup("alice").unwrap().channel_id, second);
        assert_eq!(registry.snapshot(), vec!["alice".to_string()]);
    }

    #[test]
    fn reregistration_twice_leaves_single_mapping() {
        let mut registry = Registry::new();
        let (tx1, _rx1) = entry();
        let (tx2, _rx2) = entry();
        let (tx3, _rx3) = entry();

        registry.register("alice".to_string(), ChannelId::from("chan_00000001"), tx1);
        registry.register("alice".to_string(), ChannelId::from("chan_00000002"), tx2);
        let latest = ChannelId::from("chan_00000003");
        registry.register("alice".to_string(), latest, tx3);

        assert_eq!(registry.snapshot().len(), 1);
        assert_eq!(registry.lookup("alice").unwrap().channel_id, latest);
    }

    #[test]
    fn unregister_removes_mapping() {
        let mut registry = Registry::new();
        let id = ChannelId::from("chan_00000001");
        let (tx, _rx) = entry();

        registry.register("alice".to_string(), id, tx);
        assert_eq!(registry.unregister(id), Some("alice".to_string()));
        assert!(registry.lookup("alice").is_err());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn unregister_unknown_channel_is_noop() {
        let mut registry = Registry::new();
        assert_eq!(registry.unregister(ChannelId::from("chan_deadbeef")), None);
    }

    #[test]
    fn stale_channel_disconnect_keeps_newer_registration() {
        let mut registry = Registry::new();
        let old = ChannelId::from("chan_00000001");
        let new = ChannelId::from("chan_00000002");
        let (tx1, _rx1) = entry();
        let (tx2, _rx2) = entry();

        registry.register("alice".to_string(), old, tx1);
        registry.register("alice".to_string(), new, tx2);

        // The old socket closing must not evict the reconnected alice.
        assert_eq!(registry.unregister(old), None);
        assert_eq!(registry.lookup("alice").unwrap().channel_id, new);
    }

    #[test]
    fn snapshot_contains_each_name_exactly_once() {
        let mut registry = Registry::new();
        let (tx1, _rx1) = entry();
        let (tx2, _rx2) = entry();

        registry.register("alice".to_string(), ChannelId::from("chan_00000001"), tx1);
        registry.register("bob".to_string(), ChannelId::from("chan_00000002"), tx2);

        let mut roster = registry.snapshot();
        roster.sort();
        assert_eq!(roster, vec!["alice".to_string(), "bob".to_string()]);
    }
}
