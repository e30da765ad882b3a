//! End-to-end flows through a real daemon over its Unix socket.

mod common;

use common::TestDaemon;
use hirc_proto::{ChannelId, ChannelMessage, ClientMsg, DaemonMsg};
use hircd::irc::LinkEvent;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn chan_a() -> ChannelId {
    ChannelId::new("TS", "#a")
}

fn inbound(text: &str, author: &str) -> LinkEvent {
    LinkEvent::Message {
        server: "TS".into(),
        channel: "#a".into(),
        message: ChannelMessage::chat(text, author, chrono::Local::now().fixed_offset()),
    }
}

#[tokio::test]
async fn hello_enumerates_configured_channels() {
    let daemon = TestDaemon::start().await;
    let client = daemon.client().await;

    assert_eq!(client.client_id, 1);
    let mut advertised = client.available.clone();
    advertised.sort();
    assert_eq!(
        advertised,
        vec![ChannelId::new("TS", "#a"), ChannelId::new("TS", "#b")]
    );

    daemon.shutdown().await;
}

#[tokio::test]
async fn client_ids_strictly_increase_across_sessions() {
    let daemon = TestDaemon::start().await;

    let mut first = daemon.client().await;
    let second = daemon.client().await;
    assert_eq!(first.client_id, 1);
    assert_eq!(second.client_id, 2);

    // Even after a client leaves, its id is never reused.
    first.send(DaemonMsg::Goodbye).await;
    first.expect_closed().await;
    let third = daemon.client().await;
    assert_eq!(third.client_id, 3);

    daemon.shutdown().await;
}

#[tokio::test]
async fn subscribe_returns_empty_snapshot_for_fresh_channel() {
    let daemon = TestDaemon::start().await;
    let mut client = daemon.client().await;

    let reply = client.subscribe(vec![chan_a()]).await;
    let ClientMsg::Subscriptions { channels } = reply else {
        panic!("expected Subscriptions, got {reply:?}");
    };
    assert_eq!(channels.len(), 1);
    let data = &channels[&chan_a()];
    assert!(data.users.is_empty());
    assert!(data.log.is_empty());
    assert_eq!(data.topic, "");

    daemon.shutdown().await;
}

#[tokio::test]
async fn send_message_is_echoed_locally_with_me_author() {
    let daemon = TestDaemon::start().await;
    let mut client = daemon.client().await;
    client.subscribe(vec![chan_a()]).await;

    let before = chrono::Local::now().fixed_offset();
    client
        .send(DaemonMsg::SendMessage {
            target: chan_a(),
            text: "hello".into(),
        })
        .await;

    match client.recv().await {
        ClientMsg::NewMessage { target, message } => {
            assert_eq!(target, chan_a());
            assert_eq!(message.body().text, "hello");
            assert_eq!(message.body().author, "ME");
            let delta = message.body().timestamp - before;
            assert!(delta.num_seconds().abs() <= 1, "echo timestamp too far off");
        }
        other => panic!("expected NewMessage, got {other:?}"),
    }

    daemon.shutdown().await;
}

#[tokio::test]
async fn inbound_fans_out_to_all_subscribers_in_order() {
    let daemon = TestDaemon::start().await;
    let mut alice_view = daemon.client().await;
    let mut bob_view = daemon.client().await;
    alice_view.subscribe(vec![chan_a()]).await;
    bob_view.subscribe(vec![chan_a()]).await;

    daemon.inject(inbound("hi", "alice"));
    daemon.inject(inbound("again", "alice"));

    for client in [&mut alice_view, &mut bob_view] {
        match client.recv().await {
            ClientMsg::NewMessage { message, .. } => {
                assert_eq!(message.body().text, "hi");
                assert_eq!(message.body().author, "alice");
            }
            other => panic!("expected NewMessage, got {other:?}"),
        }
        match client.recv().await {
            ClientMsg::NewMessage { message, .. } => {
                assert_eq!(message.body().text, "again");
            }
            other => panic!("expected NewMessage, got {other:?}"),
        }
    }

    daemon.shutdown().await;
}

#[tokio::test]
async fn goodbye_closes_the_session_and_spares_the_rest() {
    let daemon = TestDaemon::start().await;
    let mut leaver = daemon.client().await;
    let mut stayer = daemon.client().await;
    leaver.subscribe(vec![chan_a()]).await;
    stayer.subscribe(vec![chan_a()]).await;

    leaver.send(DaemonMsg::Goodbye).await;
    leaver.expect_closed().await;

    daemon.inject(inbound("hi", "alice"));
    match stayer.recv().await {
        ClientMsg::NewMessage { message, .. } => assert_eq!(message.body().text, "hi"),
        other => panic!("expected NewMessage, got {other:?}"),
    }

    daemon.shutdown().await;
}

#[tokio::test]
async fn late_subscriber_receives_earlier_history() {
    let daemon = TestDaemon::start().await;

    daemon.inject(inbound("early", "alice"));
    daemon.settle().await;

    let mut client = daemon.client().await;
    let reply = client.subscribe(vec![chan_a()]).await;
    let ClientMsg::Subscriptions { channels } = reply else {
        panic!("expected Subscriptions, got {reply:?}");
    };
    let log = &channels[&chan_a()].log;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].body().text, "early");
    assert_eq!(log[0].body().author, "alice");

    daemon.shutdown().await;
}

#[tokio::test]
async fn duplicate_subscribe_delivers_messages_once() {
    let daemon = TestDaemon::start().await;
    let mut client = daemon.client().await;
    client.subscribe(vec![chan_a()]).await;
    client.subscribe(vec![chan_a()]).await;

    daemon.inject(inbound("hi", "alice"));
    assert!(matches!(
        client.recv().await,
        ClientMsg::NewMessage { .. }
    ));
    // No duplicate delivery follows.
    assert!(
        client
            .try_recv(Duration::from_millis(200))
            .await
            .is_none()
    );

    daemon.shutdown().await;
}

#[tokio::test]
async fn topic_updates_reach_subscribers() {
    let daemon = TestDaemon::start().await;
    let mut client = daemon.client().await;
    client.subscribe(vec![chan_a()]).await;

    daemon.inject(LinkEvent::InitialTopic {
        server: "TS".into(),
        channel: "#a".into(),
        topic: "welcome".into(),
    });
    match client.recv().await {
        ClientMsg::InitialTopic { target, topic } => {
            assert_eq!(target, chan_a());
            assert_eq!(topic, "welcome");
        }
        other => panic!("expected InitialTopic, got {other:?}"),
    }

    daemon.inject(LinkEvent::TopicChanged {
        server: "TS".into(),
        channel: "#a".into(),
        message: ChannelMessage::topic("fresh", "alice", chrono::Local::now().fixed_offset()),
    });
    match client.recv().await {
        ClientMsg::NewTopic { message, .. } => {
            assert_eq!(message.body().text, "fresh");
        }
        other => panic!("expected NewTopic, got {other:?}"),
    }

    daemon.shutdown().await;
}

#[tokio::test]
async fn malformed_envelope_terminates_only_that_session() {
    let daemon = TestDaemon::start().await;
    let mut healthy = daemon.client().await;
    healthy.subscribe(vec![chan_a()]).await;

    // Speak the framing by hand: read the Hello frame, then send a frame
    // whose payload is an unknown tag.
    let mut raw = tokio::net::UnixStream::connect(daemon.socket_path())
        .await
        .expect("connect raw");
    let mut len = [0u8; 4];
    raw.read_exact(&mut len).await.expect("hello length");
    let mut payload = vec![0u8; u32::from_be_bytes(len) as usize];
    raw.read_exact(&mut payload).await.expect("hello payload");

    raw.write_all(&[0, 0, 0, 1, 0xEE]).await.expect("garbage");

    // The daemon drops the malformed session...
    let n = raw.read(&mut len).await.expect("read after garbage");
    assert_eq!(n, 0, "expected EOF after malformed envelope");

    // ...and everyone else keeps working.
    daemon.inject(inbound("still here", "alice"));
    match healthy.recv().await {
        ClientMsg::NewMessage { message, .. } => {
            assert_eq!(message.body().text, "still here")
        }
        other => panic!("expected NewMessage, got {other:?}"),
    }

    daemon.shutdown().await;
}
