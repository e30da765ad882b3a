//! Client session registry entries.

use hirc_proto::{ChannelId, ClientMsg};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Registry entry for one connected local client.
///
/// `queue` is the sending half of the client's outbound queue; the receiving
/// half lives in that client's session task. Dropping this entry closes the
/// queue, which is how teardown tells the session to drop its socket and
/// exit.
#[derive(Debug)]
pub struct ClientEntry {
    pub queue: mpsc::UnboundedSender<ClientMsg>,
    pub subscribed: HashSet<ChannelId>,
}

impl ClientEntry {
    pub fn new(queue: mpsc::UnboundedSender<ClientMsg>) -> Self {
        Self {
            queue,
            subscribed: HashSet::new(),
        }
    }
}
