//! Connector - owns one upstream IRC session.

use crate::config::{Security, ServerBlock};
use crate::irc::codec::{CodecError, IrcCodec};
use crate::irc::message::Line;
use crate::irc::{LinkCommand, LinkEvent};
use chrono::Local;
use futures_util::{SinkExt, StreamExt};
use hirc_proto::ChannelMessage;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::{InvalidDnsNameError, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, warn};

/// Errors that end an upstream session.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid TLS server name: {0}")]
    ServerName(#[from] InvalidDnsNameError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// One upstream IRC session, driven as a spawned task.
pub struct Connector {
    server: String,
    block: ServerBlock,
    nick: String,
    events: mpsc::UnboundedSender<LinkEvent>,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
}

impl Connector {
    /// Spawn the connector for one configured server. Returns the command
    /// handle for outbound sends and the task handle for shutdown.
    pub fn spawn(
        server: String,
        block: ServerBlock,
        nick: String,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> (mpsc::UnboundedSender<LinkCommand>, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connector = Self {
            server,
            block,
            nick,
            events,
            commands: command_rx,
        };
        let task = tokio::spawn(connector.run());
        (command_tx, task)
    }

    #[instrument(skip(self), fields(server = %self.server), name = "irc_link")]
    async fn run(mut self) {
        info!(host = %self.block.host, port = self.block.port, "Connecting upstream");
        match self.connect_and_drive().await {
            Ok(()) => info!("Upstream session ended"),
            Err(e) => warn!(error = %e, "Upstream session failed"),
        }
        // Whatever happened, the handle goes absent. The daemon does not
        // reconnect; sends to this server are dropped from here on.
        let _ = self.events.send(LinkEvent::Closed {
            server: self.server.clone(),
        });
    }

    async fn connect_and_drive(&mut self) -> Result<(), LinkError> {
        let tcp = TcpStream::connect((self.block.host.as_str(), self.block.port)).await?;
        match self.block.security {
            Security::Plain => self.drive(Framed::new(tcp, IrcCodec)).await,
            Security::Tls => {
                let tls = tls_connect(tcp, &self.block.host).await?;
                self.drive(Framed::new(tls, IrcCodec)).await
            }
        }
    }

    /// Register, then pump lines and outbound commands until either side
    /// closes.
    async fn drive<S>(&mut self, mut framed: Framed<S, IrcCodec>) -> Result<(), LinkError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let nick = self.nick.clone();
        framed.send(Line::cmd("NICK", [nick.as_str()])).await?;
        framed
            .send(Line::cmd("USER", [nick.as_str(), "0", "*", nick.as_str()]))
            .await?;

        loop {
            tokio::select! {
                line = framed.next() => match line {
                    Some(Ok(line)) => self.handle_line(&mut framed, line).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
                command = self.commands.recv() => match command {
                    Some(LinkCommand::Privmsg { channel, text }) => {
                        framed.send(Line::privmsg(&channel, &text)).await?;
                    }
                    // Daemon dropped the handle: shutting down.
                    None => return Ok(()),
                },
            }
        }
    }

    async fn handle_line<S>(
        &mut self,
        framed: &mut Framed<S, IrcCodec>,
        line: Line,
    ) -> Result<(), LinkError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match line.command.as_str() {
            "PING" => {
                framed.send(Line::cmd("PONG", line.params)).await?;
            }
            // RPL_WELCOME: registration is done, identify and join.
            "001" => {
                info!(nick = %self.nick, "Registered upstream");
                if let Some(password) = &self.block.password {
                    let raw = self.block.identify.replace("{password}", password);
                    match Line::parse(&raw) {
                        Ok(identify) => framed.send(identify).await?,
                        Err(e) => warn!(error = %e, "Unusable identify template"),
                    }
                }
                for channel in self.block.default_channels.clone() {
                    framed.send(Line::cmd("JOIN", [channel])).await?;
                }
            }
            "PRIVMSG" => self.handle_privmsg(&line),
            // RPL_TOPIC: <me> <channel> :<topic>
            "332" => {
                if let [_, channel, topic] = line.params.as_slice() {
                    self.emit(LinkEvent::InitialTopic {
                        server: self.server.clone(),
                        channel: channel.clone(),
                        topic: topic.clone(),
                    });
                }
            }
            "TOPIC" => {
                if let ([channel, topic], Some(nick)) =
                    (line.params.as_slice(), line.source_nick())
                {
                    self.emit(LinkEvent::TopicChanged {
                        server: self.server.clone(),
                        channel: channel.clone(),
                        message: ChannelMessage::topic(
                            topic.clone(),
                            nick,
                            Local::now().fixed_offset(),
                        ),
                    });
                }
            }
            // RPL_NAMREPLY: <me> <sym> <channel> :<prefixed nicks>
            "353" => {
                if let [_, _, channel, names] = line.params.as_slice() {
                    let users = names
                        .split_whitespace()
                        .map(|nick| nick.trim_start_matches(['@', '+', '~', '&', '%']).to_string())
                        .collect();
                    self.emit(LinkEvent::Names {
                        server: self.server.clone(),
                        channel: channel.clone(),
                        users,
                    });
                }
            }
            "JOIN" => {
                if let (Some(channel), Some(nick)) =
                    (line.params.first(), line.source_nick())
                {
                    self.emit(LinkEvent::Joined {
                        server: self.server.clone(),
                        channel: channel.clone(),
                        nick: nick.to_string(),
                    });
                }
            }
            "PART" => {
                if let (Some(channel), Some(nick)) =
                    (line.params.first(), line.source_nick())
                {
                    self.emit(LinkEvent::Parted {
                        server: self.server.clone(),
                        channel: channel.clone(),
                        nick: nick.to_string(),
                    });
                }
            }
            "QUIT" => {
                if let Some(nick) = line.source_nick() {
                    self.emit(LinkEvent::Quit {
                        server: self.server.clone(),
                        nick: nick.to_string(),
                    });
                }
            }
            other => debug!(command = %other, "Ignoring upstream line"),
        }
        Ok(())
    }

    /// `Privmsg` addressed to a channel with a channel-scoped sender becomes
    /// a `Message` event; everything else is discarded at this layer.
    fn handle_privmsg(&self, line: &Line) {
        let [target, text] = line.params.as_slice() else {
            return;
        };
        if !is_channel(target) {
            return;
        }
        let Some(nick) = line.source_nick() else {
            return;
        };
        // Our own lines were already echoed locally by the dispatcher.
        if nick == self.nick {
            return;
        }
        self.emit(LinkEvent::Message {
            server: self.server.clone(),
            channel: target.clone(),
            message: ChannelMessage::chat(text.clone(), nick, Local::now().fixed_offset()),
        });
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.events.send(event);
    }
}

fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

/// Upgrade an outbound TCP stream to TLS against the platform trust roots.
async fn tls_connect(
    tcp: TcpStream,
    host: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, LinkError> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "Skipping unusable root certificate");
        }
    }
    for e in &native.errors {
        warn!(error = %e, "Error loading native certificates");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let name = ServerName::try_from(host.to_string())?;
    Ok(connector.connect(name, tcp).await?)
}
