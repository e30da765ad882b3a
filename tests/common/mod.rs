//! Shared test harness: an in-process daemon on a temp-dir socket and a
//! test client speaking the real envelope codec over a `UnixStream`.

use futures_util::{SinkExt, StreamExt};
use hirc_proto::{ChannelId, ClientCodec, ClientId, ClientMsg, DaemonMsg, DaemonRequest};
use hircd::config::Config;
use hircd::daemon::Daemon;
use hircd::irc::LinkEvent;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub struct TestDaemon {
    daemon: Daemon,
    _dir: TempDir,
}

impl TestDaemon {
    /// Start a daemon configured with one server `TS` carrying default
    /// channels `#a` and `#b`, on a socket inside a fresh temp dir.
    ///
    /// The upstream points at a port nothing listens on, so the connector
    /// fails fast and the link goes absent - which is exactly the silent
    /// drop path `SendMessage` is specified to take.
    pub async fn start() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let socket = dir.path().join("hircd.sock");
        let config: Config = toml::from_str(&format!(
            r##"
            default_user_name = "wren"
            socket = "{}"

            [servers.TS]
            host = "127.0.0.1"
            port = 9
            default_channels = ["#a", "#b"]
            "##,
            socket.display()
        ))
        .expect("parse test config");

        let daemon = Daemon::start(&config).expect("start daemon");
        Self { daemon, _dir: dir }
    }

    pub fn socket_path(&self) -> &Path {
        self.daemon.socket_path()
    }

    /// Connect a new client and consume its `Hello`.
    pub async fn client(&self) -> TestClient {
        TestClient::connect(self.socket_path()).await
    }

    /// Push an event onto the IRC inbound queue, as a connector would.
    pub fn inject(&self, event: LinkEvent) {
        self.daemon
            .link_events
            .send(event)
            .expect("dispatcher alive");
    }

    /// Give the dispatcher a beat to drain its queues.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    pub async fn shutdown(self) {
        self.daemon.shutdown().await;
    }
}

pub struct TestClient {
    frames: Framed<UnixStream, ClientCodec>,
    pub client_id: ClientId,
    pub available: Vec<ChannelId>,
}

impl TestClient {
    pub async fn connect(path: &Path) -> Self {
        let stream = UnixStream::connect(path).await.expect("connect to daemon");
        let mut frames = Framed::new(stream, ClientCodec);

        let hello = timeout(RECV_TIMEOUT, frames.next())
            .await
            .expect("hello within timeout")
            .expect("socket open")
            .expect("decodable hello");
        let ClientMsg::Hello {
            client_id,
            available_channels,
        } = hello
        else {
            panic!("first envelope was not Hello: {hello:?}");
        };

        Self {
            frames,
            client_id,
            available: available_channels,
        }
    }

    pub async fn send(&mut self, msg: DaemonMsg) {
        let request = DaemonRequest {
            source: self.client_id,
            msg,
        };
        self.frames.send(request).await.expect("send request");
    }

    pub async fn subscribe(&mut self, channels: Vec<ChannelId>) -> ClientMsg {
        self.send(DaemonMsg::Subscribe { channels }).await;
        self.recv().await
    }

    /// Next envelope, panicking on timeout or close.
    pub async fn recv(&mut self) -> ClientMsg {
        timeout(RECV_TIMEOUT, self.frames.next())
            .await
            .expect("envelope within timeout")
            .expect("socket open")
            .expect("decodable envelope")
    }

    /// Next envelope, or `None` if nothing arrives in `wait`.
    pub async fn try_recv(&mut self, wait: Duration) -> Option<ClientMsg> {
        match timeout(wait, self.frames.next()).await {
            Ok(Some(Ok(msg))) => Some(msg),
            _ => None,
        }
    }

    /// Wait for the daemon to close this session's socket.
    pub async fn expect_closed(&mut self) {
        let next = timeout(RECV_TIMEOUT, self.frames.next())
            .await
            .expect("close within timeout");
        assert!(next.is_none(), "expected EOF, got {next:?}");
    }
}
