//! Shared state for the daemon.
//!
//! Contains the Switchboard (server/channel map, client registry,
//! subscription index) and its entity types. Only the dispatcher mutates
//! server state and subscriptions; everyone else takes snapshot reads.

mod channel;
mod client;
mod server;
mod switchboard;

pub use channel::ChannelState;
pub use client::ClientEntry;
pub use server::ServerState;
pub use switchboard::Switchboard;
