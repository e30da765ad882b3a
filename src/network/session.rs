//! Per-client session task: decodes inbound envelopes onto the daemon
//! request queue and drains the client's outbound queue onto the socket.

use crate::dispatch::ClientRequest;
use crate::state::Switchboard;
use futures_util::{SinkExt, StreamExt};
use hirc_proto::{ClientId, ClientMsg, DaemonCodec};
use std::sync::Arc;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Set up a freshly accepted client: allocate its id, enqueue `Hello` as
/// the first outbound envelope, publish the queue in the registry, and
/// spawn the session task.
///
/// The `Hello` send happens before the queue is registered anywhere, so no
/// dispatcher write can precede it and the id can never be observed twice.
pub(crate) fn spawn(
    stream: UnixStream,
    state: &Arc<Switchboard>,
    requests: &mpsc::UnboundedSender<ClientRequest>,
) {
    let client = state.next_client_id();
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();

    let hello = ClientMsg::Hello {
        client_id: client,
        available_channels: state.channel_catalog(),
    };
    let _ = queue_tx.send(hello);
    state.register_client(client, queue_tx);
    info!(client, "Client connected");

    tokio::spawn(run_session(stream, client, requests.clone(), queue_rx));
}

/// The reader and writer roles of one session, multiplexed over the
/// unsplit stream so that every exit path drops the whole connection at
/// once and the peer sees its socket close.
///
/// Inbound envelopes are tagged with the session id and pushed onto the
/// daemon request queue. Outbound envelopes are drained from the client's
/// queue. The loop ends on peer close, decode error, write failure, or the
/// queue closing (teardown dropped the sender); the final `Disconnected`
/// lets the dispatcher scrub whatever state remains.
async fn run_session(
    stream: UnixStream,
    client: ClientId,
    requests: mpsc::UnboundedSender<ClientRequest>,
    mut queue: mpsc::UnboundedReceiver<ClientMsg>,
) {
    let mut frames = Framed::new(stream, DaemonCodec);

    loop {
        tokio::select! {
            inbound = frames.next() => match inbound {
                Some(Ok(request)) => {
                    if request.source != client {
                        debug!(
                            client,
                            claimed = request.source,
                            "Envelope source differs from session id; using session id"
                        );
                    }
                    let envelope = ClientRequest::Envelope {
                        client,
                        msg: request.msg,
                    };
                    if requests.send(envelope).is_err() {
                        // Dispatcher is gone; the daemon is shutting down.
                        return;
                    }
                }
                Some(Err(e)) => {
                    warn!(client, error = %e, "Malformed envelope; closing session");
                    break;
                }
                None => break,
            },
            outbound = queue.recv() => match outbound {
                Some(envelope) => {
                    if let Err(e) = frames.send(envelope).await {
                        debug!(client, error = %e, "Write failed; closing session");
                        break;
                    }
                }
                // Teardown closed the queue; dropping the stream closes
                // the socket.
                None => break,
            },
        }
    }

    let _ = requests.send(ClientRequest::Disconnected { client });
    debug!(client, "Session closed");
}
