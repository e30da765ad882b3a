//! Session logic for the thin terminal client.
//!
//! Pure state machine: envelopes and input events go in, daemon requests
//! come out. The terminal view in `bin/hirc.rs` renders whatever is here.

mod session;

pub use session::Session;
