//! hircd - a multiplexing IRC daemon.
//!
//! The daemon keeps persistent IRC sessions open on behalf of a single user,
//! caches per-channel message history in memory, and serves any number of
//! short-lived local clients over a Unix stream socket speaking the
//! length-framed envelope protocol of [`hirc_proto`].
//!
//! Crate layout follows the runtime activities: [`irc`] owns the upstream
//! connections, [`network`] owns the local socket and client sessions,
//! [`dispatch`] is the single consumer that mutates [`state`], and
//! [`client`] is the session logic of the thin terminal client.

pub mod client;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod irc;
pub mod network;
pub mod state;
