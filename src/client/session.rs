//! Client-side session state.

use hirc_proto::{ChannelData, ChannelId, ClientId, ClientMsg, DaemonMsg, DaemonRequest};
use std::collections::BTreeMap;

/// Local state of one client session: the id learned from `Hello`,
/// per-channel buffers, the channel currently in view, and the input line.
#[derive(Debug, Default)]
pub struct Session {
    client_id: Option<ClientId>,
    pub channels: BTreeMap<ChannelId, ChannelData>,
    pub current: Option<ChannelId>,
    pub input: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    /// Apply one inbound envelope. Returns the request to send back, if the
    /// protocol calls for one (`Hello` triggers the eager subscribe to
    /// everything the daemon advertised).
    pub fn handle_envelope(&mut self, msg: ClientMsg) -> Option<DaemonMsg> {
        match msg {
            ClientMsg::Hello {
                client_id,
                available_channels,
            } => {
                self.client_id = Some(client_id);
                Some(DaemonMsg::Subscribe {
                    channels: available_channels,
                })
            }
            ClientMsg::Subscriptions { channels } => {
                self.channels = channels;
                self.current = self.channels.keys().next().cloned();
                None
            }
            ClientMsg::NewMessage { target, message } => {
                self.channels.entry(target).or_default().log.push(message);
                None
            }
            ClientMsg::NewTopic { target, message } => {
                let chan = self.channels.entry(target).or_default();
                chan.topic = message.body().text.clone();
                chan.log.push(message);
                None
            }
            ClientMsg::InitialTopic { target, topic } => {
                self.channels.entry(target).or_default().topic = topic;
                None
            }
        }
    }

    /// Enter was pressed: a non-empty input with a channel in view becomes
    /// a `SendMessage` and the input clears.
    pub fn submit_input(&mut self) -> Option<DaemonMsg> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        let target = self.current.clone()?;
        self.input.clear();
        Some(DaemonMsg::SendMessage { target, text })
    }

    /// Move the view to the next channel, wrapping around.
    pub fn next_channel(&mut self) {
        let Some(current) = &self.current else {
            self.current = self.channels.keys().next().cloned();
            return;
        };
        let next = self
            .channels
            .range(current.clone()..)
            .map(|(chan, _)| chan)
            .nth(1)
            .or_else(|| self.channels.keys().next())
            .cloned();
        self.current = next;
    }

    /// The buffer of the channel in view.
    pub fn current_data(&self) -> Option<&ChannelData> {
        self.channels.get(self.current.as_ref()?)
    }

    /// Wrap a request with this session's client id for the wire.
    pub fn request(&self, msg: DaemonMsg) -> DaemonRequest {
        DaemonRequest {
            source: self.client_id.unwrap_or(0),
            msg,
        }
    }
}
