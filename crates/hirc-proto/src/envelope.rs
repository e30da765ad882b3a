//! The tagged envelope unions carried on the local socket.

use crate::types::{ChannelData, ChannelId, ChannelMessage, ClientId};
use std::collections::BTreeMap;

/// Daemon-to-client envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMsg {
    /// First envelope on every connection: the session's id and every
    /// channel the daemon currently knows about, across all servers.
    Hello {
        client_id: ClientId,
        available_channels: Vec<ChannelId>,
    },
    /// Reply to `Subscribe`: a snapshot of each requested channel.
    Subscriptions {
        channels: BTreeMap<ChannelId, ChannelData>,
    },
    /// A chat message arrived on (or was locally echoed to) a subscribed
    /// channel.
    NewMessage {
        target: ChannelId,
        message: ChannelMessage,
    },
    /// The topic of a subscribed channel changed.
    NewTopic {
        target: ChannelId,
        message: ChannelMessage,
    },
    /// The topic a channel had when the daemon first learned it.
    InitialTopic { target: ChannelId, topic: String },
}

/// The request payload inside a [`DaemonRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum DaemonMsg {
    /// Subscribe to the given channels. Idempotent; unknown channels are
    /// valid and yield empty snapshots.
    Subscribe { channels: Vec<ChannelId> },
    /// Send a line of chat to a channel on an upstream server.
    SendMessage { target: ChannelId, text: String },
    /// End the session. No acknowledgement is sent.
    Goodbye,
}

/// Client-to-daemon envelope.
///
/// `source` is the client id the sender believes it has (learned from
/// `Hello`). The daemon routes by the session the request arrived on, not by
/// this field.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonRequest {
    pub source: ClientId,
    pub msg: DaemonMsg,
}
