//! Local socket surface.
//!
//! Contains the Listener (Unix socket accept loop) and the per-client
//! session tasks.

mod listener;
mod session;

pub use listener::Listener;
