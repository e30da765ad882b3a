//! Listener - accepts local client connections on the Unix socket.

use crate::dispatch::ClientRequest;
use crate::network::session;
use crate::state::Switchboard;
use std::path::Path;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

/// Accepts connections and spawns a session pair per client.
pub struct Listener {
    listener: UnixListener,
    state: Arc<Switchboard>,
    requests: mpsc::UnboundedSender<ClientRequest>,
}

impl Listener {
    /// Bind the socket, creating the enclosing directory and replacing a
    /// stale socket file from a previous run.
    pub fn bind(
        path: &Path,
        state: Arc<Switchboard>,
        requests: mpsc::UnboundedSender<ClientRequest>,
    ) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let listener = UnixListener::bind(path)?;
        info!(path = %path.display(), "Listening on local socket");
        Ok(Self {
            listener,
            state,
            requests,
        })
    }

    /// Accept forever. Cancelled by the daemon at shutdown.
    #[instrument(skip(self), name = "listener")]
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    session::spawn(stream, &self.state, &self.requests);
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept client connection");
                }
            }
        }
    }
}
