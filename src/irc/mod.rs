//! Upstream IRC connections.
//!
//! One [`Connector`] task per configured server owns that server's TCP (or
//! TLS) session: it registers, joins the default channels, answers PING
//! itself, and surfaces channel traffic as [`LinkEvent`]s on the shared IRC
//! inbound queue. Outbound chat arrives as [`LinkCommand`]s from the
//! dispatcher.

pub mod codec;
pub mod message;
mod session;

pub use codec::{CodecError, IrcCodec};
pub use message::{Line, ParseError};
pub use session::{Connector, LinkError};

use hirc_proto::ChannelMessage;

/// Outbound command from the dispatcher into a connector.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCommand {
    Privmsg { channel: String, text: String },
}

/// Inbound event surfaced by a connector onto the IRC inbound queue.
///
/// The dispatcher is the only consumer; everything that mutates channel
/// state goes through it.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A chat line arrived on a channel.
    Message {
        server: String,
        channel: String,
        message: ChannelMessage,
    },
    /// The topic a channel had when we joined (RPL_TOPIC).
    InitialTopic {
        server: String,
        channel: String,
        topic: String,
    },
    /// Someone changed a channel's topic.
    TopicChanged {
        server: String,
        channel: String,
        message: ChannelMessage,
    },
    /// A RPL_NAMREPLY batch of nicks present on a channel.
    Names {
        server: String,
        channel: String,
        users: Vec<String>,
    },
    Joined {
        server: String,
        channel: String,
        nick: String,
    },
    Parted {
        server: String,
        channel: String,
        nick: String,
    },
    /// A user quit the server (leaves every channel).
    Quit { server: String, nick: String },
    /// The upstream session is gone; the server handle goes absent.
    Closed { server: String },
}
