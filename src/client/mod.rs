//! Client Module
//!
//! Sends commands to the speech application.
//!
//! ## Architecture
//! - Fire-and-forget commands: synchronous connect/write/close on the caller's thread
//! - Queries: one worker thread and one socket per request, polled with
//!   a doubling backoff and cancellable at each poll boundary
//! - Nothing is shared between requests

mod backoff;
mod commands;
mod pending;
mod transport;

pub use backoff::Backoff;
pub use commands::Client;
pub use pending::{Outcome, PendingRequest, NO_RESULT};
pub use transport::send_bytes;
