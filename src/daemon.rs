//! Daemon assembly and lifecycle.
//!
//! Wires the shared state, the two inbound queues, the per-server
//! connectors, the dispatcher, and the socket listener into a running
//! daemon. Used by the `hircd` binary and by the integration tests, which
//! keep the link-event handle to inject upstream traffic.

use crate::config::Config;
use crate::dispatch::{ClientRequest, Dispatcher};
use crate::irc::{Connector, LinkEvent};
use crate::network::Listener;
use crate::state::Switchboard;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// A running daemon and the handles needed to stop it.
pub struct Daemon {
    pub state: Arc<Switchboard>,
    /// Producer side of the IRC inbound queue. Connectors hold clones; kept
    /// here so tests can inject link events directly.
    pub link_events: mpsc::UnboundedSender<LinkEvent>,
    /// Producer side of the daemon request queue, cloned into each session
    /// reader.
    requests: mpsc::UnboundedSender<ClientRequest>,
    listener: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
    connectors: Vec<JoinHandle<()>>,
    socket_path: PathBuf,
}

impl Daemon {
    /// Bind the socket and spawn every long-lived activity.
    ///
    /// Must run inside a tokio runtime. Fails only on socket setup; a
    /// server that cannot be reached just loses its link in the background.
    pub fn start(config: &Config) -> std::io::Result<Self> {
        let state = Arc::new(Switchboard::new(config));
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (link_event_tx, link_event_rx) = mpsc::unbounded_channel();

        let mut connectors = Vec::new();
        for (name, block) in &config.servers {
            let nick = block.nick(&config.default_user_name).to_string();
            let (commands, task) = Connector::spawn(
                name.clone(),
                block.clone(),
                nick,
                link_event_tx.clone(),
            );
            state.set_link(name, commands);
            connectors.push(task);
        }

        let dispatcher = Dispatcher::new(Arc::clone(&state), request_rx, link_event_rx);
        let dispatcher = tokio::spawn(dispatcher.run());

        let socket_path = config.socket_path();
        let listener = Listener::bind(&socket_path, Arc::clone(&state), request_tx.clone())?;
        let listener = tokio::spawn(listener.run());

        Ok(Self {
            state,
            link_events: link_event_tx,
            requests: request_tx,
            listener,
            dispatcher,
            connectors,
            socket_path,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Stop everything: listener first (no new clients), then the upstream
    /// connectors, then every client queue (session tasks drop their
    /// sockets and exit), the dispatcher last. Finally unlink the socket
    /// file.
    pub async fn shutdown(self) {
        self.listener.abort();
        for connector in self.connectors {
            connector.abort();
        }
        self.state.close_all_clients();
        drop(self.requests);
        self.dispatcher.abort();
        let _ = self.dispatcher.await;
        let _ = std::fs::remove_file(&self.socket_path);
        info!("Shutdown complete");
    }
}
