//! The dispatcher - single consumer of both inbound queues and sole mutator
//! of shared state.
//!
//! Every iteration takes the next ready item from the daemon request queue
//! or the IRC inbound queue and applies it: channel-log appends and the
//! fan-out to subscriber queues happen inside one dispatcher step, which is
//! what gives every subscriber the same per-channel message order.

use crate::irc::{LinkCommand, LinkEvent};
use crate::state::Switchboard;
use chrono::Local;
use hirc_proto::{ChannelId, ChannelMessage, ClientId, ClientMsg, DaemonMsg};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Author label for locally echoed messages.
///
/// Known issue: the logged-in nick for the target server is available and
/// should eventually replace this; the placeholder is kept for protocol
/// compatibility.
const LOCAL_AUTHOR: &str = "ME";

/// One item on the daemon request queue.
#[derive(Debug)]
pub enum ClientRequest {
    /// An envelope decoded from a client socket, tagged with the session's
    /// id by the reader.
    Envelope { client: ClientId, msg: DaemonMsg },
    /// The session task exited (peer close, decode error, or write
    /// failure); tear the session down exactly as for `Goodbye`.
    Disconnected { client: ClientId },
}

/// The dispatcher and its collaborators, one field per capability: shared
/// state, the two inbound queues. Tests construct it around hand-made
/// queues and drive the handlers directly.
pub struct Dispatcher {
    state: Arc<Switchboard>,
    requests: mpsc::UnboundedReceiver<ClientRequest>,
    link_events: mpsc::UnboundedReceiver<LinkEvent>,
}

impl Dispatcher {
    pub fn new(
        state: Arc<Switchboard>,
        requests: mpsc::UnboundedReceiver<ClientRequest>,
        link_events: mpsc::UnboundedReceiver<LinkEvent>,
    ) -> Self {
        Self {
            state,
            requests,
            link_events,
        }
    }

    /// Run until both queues close. `select!` polls the two arms in random
    /// order, so neither side can starve the other while both hold data.
    pub async fn run(mut self) {
        info!("Dispatcher running");
        loop {
            tokio::select! {
                Some(request) = self.requests.recv() => self.handle_request(request),
                Some(event) = self.link_events.recv() => self.handle_link_event(event),
                else => break,
            }
        }
        info!("Dispatcher stopped");
    }

    fn handle_request(&self, request: ClientRequest) {
        match request {
            ClientRequest::Envelope { client, msg } => match msg {
                DaemonMsg::Subscribe { channels } => self.subscribe(client, channels),
                DaemonMsg::SendMessage { target, text } => {
                    self.send_message(client, target, text)
                }
                DaemonMsg::Goodbye => self.teardown(client),
            },
            ClientRequest::Disconnected { client } => self.teardown(client),
        }
    }

    fn handle_link_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Message {
                server,
                channel,
                message,
            } => self.append_and_fanout(&ChannelId::new(server, channel), message),
            LinkEvent::InitialTopic {
                server,
                channel,
                topic,
            } => {
                let target = ChannelId::new(server, channel);
                self.state
                    .with_channel(&target, |chan| chan.topic = topic.clone());
                for client in self.state.subscribers(&target) {
                    self.state.push_to_client(
                        client,
                        ClientMsg::InitialTopic {
                            target: target.clone(),
                            topic: topic.clone(),
                        },
                    );
                }
            }
            LinkEvent::TopicChanged {
                server,
                channel,
                message,
            } => {
                let target = ChannelId::new(server, channel);
                self.state.with_channel(&target, |chan| {
                    chan.topic = message.body().text.clone();
                    chan.append(message.clone());
                });
                for client in self.state.subscribers(&target) {
                    self.state.push_to_client(
                        client,
                        ClientMsg::NewTopic {
                            target: target.clone(),
                            message: message.clone(),
                        },
                    );
                }
            }
            LinkEvent::Names {
                server,
                channel,
                users,
            } => {
                let target = ChannelId::new(server, channel);
                self.state
                    .with_channel(&target, |chan| chan.users.extend(users));
            }
            LinkEvent::Joined {
                server,
                channel,
                nick,
            } => {
                let target = ChannelId::new(server, channel);
                self.state.with_channel(&target, |chan| {
                    chan.users.insert(nick);
                });
            }
            LinkEvent::Parted {
                server,
                channel,
                nick,
            } => {
                let target = ChannelId::new(server, channel);
                self.state.with_channel(&target, |chan| {
                    chan.users.remove(&nick);
                });
            }
            LinkEvent::Quit { server, nick } => {
                if let Some(mut entry) = self.state.servers.get_mut(&server) {
                    for chan in entry.channels.values_mut() {
                        chan.users.remove(&nick);
                    }
                }
            }
            LinkEvent::Closed { server } => {
                warn!(%server, "Upstream link lost; sends to it drop until restart");
                self.state.clear_link(&server);
            }
        }
    }

    /// `Subscribe`: snapshot each requested channel (empty for unknown
    /// ones), record the subscription on both sides of the index, reply
    /// with the snapshots. Duplicate subscriptions are idempotent.
    fn subscribe(&self, client: ClientId, channels: Vec<ChannelId>) {
        let mut snapshots = BTreeMap::new();
        for chan in channels {
            let snapshot = self.state.channel_snapshot(&chan).unwrap_or_default();
            self.state.subscribe(client, &chan);
            snapshots.insert(chan, snapshot);
        }
        debug!(client, count = snapshots.len(), "Subscribed");
        self.state
            .push_to_client(client, ClientMsg::Subscriptions { channels: snapshots });
    }

    /// `SendMessage`: hand the text to the server's connector (dropped
    /// silently if the link is absent), then append the local echo and fan
    /// it out. The sender sees its own message through its subscription.
    fn send_message(&self, client: ClientId, target: ChannelId, text: String) {
        match self.state.link(&target.server) {
            Some(link) => {
                let _ = link.send(LinkCommand::Privmsg {
                    channel: target.channel.clone(),
                    text: text.clone(),
                });
            }
            None => debug!(client, server = %target.server, "No upstream link; send dropped"),
        }

        let echo = ChannelMessage::chat(text, LOCAL_AUTHOR, Local::now().fixed_offset());
        self.append_and_fanout(&target, echo);
    }

    /// Append to the channel log and enqueue `NewMessage` to every
    /// subscriber, in one dispatcher step.
    fn append_and_fanout(&self, target: &ChannelId, message: ChannelMessage) {
        self.state
            .with_channel(target, |chan| chan.append(message.clone()));
        for client in self.state.subscribers(target) {
            self.state.push_to_client(
                client,
                ClientMsg::NewMessage {
                    target: target.clone(),
                    message: message.clone(),
                },
            );
        }
    }

    /// `Goodbye` / session exit: close the outbound queue, drop the
    /// registry entry, scrub every subscription bucket. The session task
    /// observes the queue close and drops the socket. Idempotent, and no
    /// acknowledgement is sent.
    fn teardown(&self, client: ClientId) {
        if self.state.is_registered(client) {
            info!(client, "Client session closed");
        }
        self.state.remove_client(client);
    }
}
