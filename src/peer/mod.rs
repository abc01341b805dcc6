//! Peer Module
//!
//! A loopback implementation of the speech application's side of the
//! protocol, for tests and local experiments.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop
//! - One handler thread per connection, one request per connection
//! - Optional playback thread that retires queued lines over time
//! - All handlers share a [`PeerState`]

mod server;
mod connection;
mod state;

pub use server::{Peer, PeerConfig, PeerConfigBuilder, PeerHandle};
pub use connection::Connection;
pub use state::{PeerState, Utterance};
