//! Per-channel cached state.

use hirc_proto::{ChannelData, ChannelMessage};
use std::collections::BTreeSet;

/// What the daemon knows about one channel on one server.
///
/// The message log grows without bound for the daemon's lifetime; history is
/// not persisted across restarts.
#[derive(Debug, Default, Clone)]
pub struct ChannelState {
    pub topic: String,
    pub log: Vec<ChannelMessage>,
    pub users: BTreeSet<String>,
}

impl ChannelState {
    /// Append a message in arrival order.
    pub fn append(&mut self, message: ChannelMessage) {
        self.log.push(message);
    }

    /// Point-in-time copy in the wire representation.
    pub fn snapshot(&self) -> ChannelData {
        ChannelData {
            users: self.users.iter().cloned().collect(),
            log: self.log.clone(),
            topic: self.topic.clone(),
        }
    }
}
