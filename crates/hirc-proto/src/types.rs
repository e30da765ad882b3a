//! Core protocol data types shared by daemon and client.

use chrono::{DateTime, FixedOffset};
use std::fmt;

/// Daemon-assigned client session identifier.
///
/// Allocated at accept time, strictly increasing over the daemon's lifetime
/// starting at 1. Never reused, even after the client disconnects.
pub type ClientId = u64;

/// A channel identified across all upstream servers: the pair of the
/// configured server label and the IRC channel name (with its leading `#`).
///
/// Ordered lexically by server then channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId {
    pub server: String,
    pub channel: String,
}

impl ChannelId {
    pub fn new(server: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server, self.channel)
    }
}

/// Payload common to both [`ChannelMessage`] variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    pub text: String,
    pub author: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// One entry in a channel's message log: ordinary chat or a topic change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Chat(MessageBody),
    Topic(MessageBody),
}

impl ChannelMessage {
    pub fn chat(
        text: impl Into<String>,
        author: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self::Chat(MessageBody {
            text: text.into(),
            author: author.into(),
            timestamp,
        })
    }

    pub fn topic(
        text: impl Into<String>,
        author: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self::Topic(MessageBody {
            text: text.into(),
            author: author.into(),
            timestamp,
        })
    }

    pub fn body(&self) -> &MessageBody {
        match self {
            Self::Chat(body) | Self::Topic(body) => body,
        }
    }
}

/// Snapshot of one channel's state, as delivered in a `Subscriptions` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelData {
    /// Nicks currently known to be present.
    pub users: Vec<String>,
    /// Message log in arrival order.
    pub log: Vec<ChannelMessage>,
    /// Current topic, empty if unset.
    pub topic: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_orders_by_server_then_channel() {
        let a = ChannelId::new("alpha", "#z");
        let b = ChannelId::new("beta", "#a");
        let c = ChannelId::new("beta", "#b");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn channel_message_body_access() {
        let ts = DateTime::parse_from_rfc3339("2026-03-01T12:00:00+00:00").unwrap();
        let msg = ChannelMessage::chat("hi", "alice", ts);
        assert_eq!(msg.body().text, "hi");
        assert_eq!(msg.body().author, "alice");
    }
}
