//! The Switchboard - shared state region of the daemon.
//!
//! Three separately mutable cells (server map, client registry, subscription
//! index) plus the client-id counter. The dispatcher is the sole mutator of
//! server state and the subscription index; the socket listener only
//! allocates ids, inserts registry entries, and takes snapshot reads of the
//! channel catalog. Because of that single-consumer discipline no cell guard
//! is ever held across another cell's operation.

use crate::config::Config;
use crate::irc::LinkCommand;
use crate::state::{ChannelState, ClientEntry, ServerState};
use dashmap::DashMap;
use hirc_proto::{ChannelId, ClientId, ClientMsg};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Central shared state.
pub struct Switchboard {
    pub servers: DashMap<String, ServerState>,
    registry: DashMap<ClientId, ClientEntry>,
    subscriptions: DashMap<ChannelId, HashSet<ClientId>>,
    next_client_id: AtomicU64,
}

impl Switchboard {
    /// Build the state region from configuration, seeding each server with
    /// its default channels. Links are wired up by the connectors.
    pub fn new(config: &Config) -> Self {
        let servers = DashMap::new();
        for (name, block) in &config.servers {
            servers.insert(
                name.clone(),
                ServerState::with_channels(block.default_channels.iter().cloned()),
            );
        }
        Self {
            servers,
            registry: DashMap::new(),
            subscriptions: DashMap::new(),
            next_client_id: AtomicU64::new(1),
        }
    }

    // ------------------------------------------------------------------
    // Client registry
    // ------------------------------------------------------------------

    /// Allocate the next client id. Strictly increasing, never reused.
    pub fn next_client_id(&self) -> ClientId {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Publish a client's outbound queue. The caller must already have
    /// enqueued the `Hello` envelope so it is first in FIFO order.
    pub fn register_client(&self, id: ClientId, queue: mpsc::UnboundedSender<ClientMsg>) {
        self.registry.insert(id, ClientEntry::new(queue));
    }

    /// Enqueue an envelope to one client. A missing entry or a closed queue
    /// makes this a silent no-op.
    pub fn push_to_client(&self, id: ClientId, msg: ClientMsg) {
        if let Some(entry) = self.registry.get(&id) {
            let _ = entry.queue.send(msg);
        }
    }

    /// Tear down a client: close its outbound queue (by dropping the entry)
    /// and scrub it from every subscription bucket. Idempotent.
    pub fn remove_client(&self, id: ClientId) {
        let Some((_, entry)) = self.registry.remove(&id) else {
            return;
        };
        for chan in &entry.subscribed {
            if let Some(mut bucket) = self.subscriptions.get_mut(chan) {
                bucket.remove(&id);
            }
        }
        self.subscriptions.retain(|_, bucket| !bucket.is_empty());
    }

    /// Close every client queue. Used at daemon shutdown so session tasks
    /// drop their sockets and exit.
    pub fn close_all_clients(&self) {
        self.registry.clear();
        self.subscriptions.clear();
    }

    pub fn is_registered(&self, id: ClientId) -> bool {
        self.registry.contains_key(&id)
    }

    // ------------------------------------------------------------------
    // Subscription index
    // ------------------------------------------------------------------

    /// Subscribe a client to a channel, updating both sides of the index.
    /// Idempotent; creates the channel (and server) entry if unknown so that
    /// every subscribed channel exists in the server map.
    pub fn subscribe(&self, id: ClientId, chan: &ChannelId) {
        let Some(mut entry) = self.registry.get_mut(&id) else {
            return;
        };
        entry.subscribed.insert(chan.clone());
        drop(entry);

        self.subscriptions
            .entry(chan.clone())
            .or_default()
            .insert(id);
        self.ensure_channel(chan);
    }

    /// Clients currently subscribed to a channel.
    pub fn subscribers(&self, chan: &ChannelId) -> Vec<ClientId> {
        self.subscriptions
            .get(chan)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True iff the registry and index agree for this client/channel pair.
    /// Test support for the symmetry invariant.
    #[cfg(test)]
    pub fn subscription_consistent(&self, id: ClientId, chan: &ChannelId) -> bool {
        let in_registry = self
            .registry
            .get(&id)
            .map(|e| e.subscribed.contains(chan))
            .unwrap_or(false);
        let in_index = self
            .subscriptions
            .get(chan)
            .map(|b| b.contains(&id))
            .unwrap_or(false);
        in_registry == in_index
    }

    // ------------------------------------------------------------------
    // Server / channel map
    // ------------------------------------------------------------------

    /// Create the channel state for `chan` if it doesn't exist yet, along
    /// with the server entry for unconfigured server labels.
    pub fn ensure_channel(&self, chan: &ChannelId) {
        self.servers
            .entry(chan.server.clone())
            .or_default()
            .channels
            .entry(chan.channel.clone())
            .or_default();
    }

    /// Snapshot of one channel, `None` if unknown.
    pub fn channel_snapshot(&self, chan: &ChannelId) -> Option<hirc_proto::ChannelData> {
        self.servers
            .get(&chan.server)
            .and_then(|server| server.channels.get(&chan.channel).map(ChannelState::snapshot))
    }

    /// Run `f` against the (lazily created) channel state. Dispatcher only.
    pub fn with_channel<R>(&self, chan: &ChannelId, f: impl FnOnce(&mut ChannelState) -> R) -> R {
        let mut server = self.servers.entry(chan.server.clone()).or_default();
        let state = server.channels.entry(chan.channel.clone()).or_default();
        f(state)
    }

    /// Every channel currently known, across all servers. Point-in-time
    /// snapshot, sorted for deterministic `Hello` enumeration.
    pub fn channel_catalog(&self) -> Vec<ChannelId> {
        let mut catalog: Vec<ChannelId> = self
            .servers
            .iter()
            .flat_map(|server| {
                server
                    .channels
                    .keys()
                    .map(|chan| ChannelId::new(server.key().clone(), chan.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        catalog.sort();
        catalog
    }

    /// Wire up (or replace) a server's outbound command handle.
    pub fn set_link(&self, server: &str, link: mpsc::UnboundedSender<LinkCommand>) {
        self.servers.entry(server.to_string()).or_default().link = Some(link);
    }

    /// Mark a server's link absent after connection loss.
    pub fn clear_link(&self, server: &str) {
        if let Some(mut entry) = self.servers.get_mut(server) {
            entry.link = None;
        }
    }

    /// Clone of the server's command handle, if connected.
    pub fn link(&self, server: &str) -> Option<mpsc::UnboundedSender<LinkCommand>> {
        self.servers.get(server).and_then(|s| s.link.clone())
    }
}
