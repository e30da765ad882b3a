//! Per-server cached state.

use crate::irc::LinkCommand;
use crate::state::ChannelState;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// What the daemon holds for one configured upstream server: its channels
/// and, while connected, the handle for outbound sends.
#[derive(Debug, Default)]
pub struct ServerState {
    pub channels: HashMap<String, ChannelState>,
    /// Command handle into the server's connector task. `None` before the
    /// connector is wired up and after the link is lost.
    pub link: Option<mpsc::UnboundedSender<LinkCommand>>,
}

impl ServerState {
    /// Seed a server with its configured default channels.
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels
                .into_iter()
                .map(|name| (name.into(), ChannelState::default()))
                .collect(),
            link: None,
        }
    }
}
