//! # talkwire
//!
//! Client for the binary TCP command protocol of a local text-to-speech
//! application, with:
//! - Fire-and-forget commands (talk, pause, resume, skip, clear)
//! - Value-returning queries polled in the background with a doubling backoff
//! - Cancellation of in-flight queries
//! - A loopback peer that speaks the server side of the protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Caller                               │
//! │               (chat bridge, CLI, tests)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Client                                 │
//! │         (one short-lived TCP connection per command)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │ Fire-and-   │          │  PendingRequest  │
//!   │  forget     │          │ (worker thread,  │
//!   │  (sync)     │          │  backoff polls)  │
//!   └──────┬──────┘          └────────┬─────────┘
//!          │                          │
//!          └────────────┬─────────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │     Peer     │
//!               │ (speech app) │
//!               └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod client;
pub mod peer;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TalkError};
pub use config::Config;
pub use client::{Client, Outcome, PendingRequest, NO_RESULT};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of talkwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
