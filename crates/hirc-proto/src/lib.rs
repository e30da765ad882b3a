//! # hirc-proto
//!
//! The wire protocol spoken between the hircd daemon and its local clients.
//!
//! Both directions carry a stream of length-prefixed binary frames over a
//! Unix stream socket. Each frame is a tagged union encoded field by field:
//! one tag byte, UTF-8 text with a 4-byte big-endian length, sequences and
//! maps with a 4-byte big-endian count. Timestamps travel as RFC 3339 text.
//!
//! - [`ClientMsg`] — daemon to client (`Hello`, `Subscriptions`,
//!   `NewMessage`, `NewTopic`, `InitialTopic`)
//! - [`DaemonRequest`] — client to daemon, wrapping a [`DaemonMsg`]
//!   (`Subscribe`, `SendMessage`, `Goodbye`)
//! - [`DaemonCodec`] / [`ClientCodec`] — tokio codecs for each end of the
//!   socket

pub mod codec;
pub mod envelope;
pub mod types;
pub mod wire;

pub use codec::{ClientCodec, DaemonCodec, MAX_FRAME_LEN};
pub use envelope::{ClientMsg, DaemonMsg, DaemonRequest};
pub use types::{ChannelData, ChannelId, ChannelMessage, ClientId, MessageBody};
pub use wire::{Decode, Encode, WireError};
