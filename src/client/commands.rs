//! Client
//!
//! The command surface used by callers: fire-and-forget controls and
//! value-returning queries.

use std::time::Duration;

use super::backoff::Backoff;
use super::pending::PendingRequest;
use super::transport;
use crate::config::Config;
use crate::error::Result;
use crate::protocol::{
    encode_simple, encode_talk, Command, TalkParameters, TextEncoding, VoiceSettings,
};

/// Client for the speech application's command port
///
/// Holds no connection; every call opens its own.
#[derive(Debug, Clone)]
pub struct Client {
    /// `host:port` of the peer
    addr: String,

    /// Settings used by [`Client::talk`]
    settings: VoiceSettings,

    connect_timeout: Duration,
    initial_backoff: Duration,
    max_poll_attempts: u32,
}

impl Client {
    /// Client for `host:port` with default settings
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let config = Config::builder().host(host).port(port).build();
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Self {
        warn_if_not_utf8(config.text_encoding);
        Self {
            addr: config.addr(),
            settings: config.voice_settings(),
            connect_timeout: config.connect_timeout(),
            initial_backoff: config.initial_backoff(),
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    /// Replace the default voice settings
    pub fn with_settings(mut self, settings: VoiceSettings) -> Self {
        warn_if_not_utf8(settings.encoding);
        self.settings = settings;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Replace the reply-poll schedule used by queries
    pub fn with_backoff(mut self, initial: Duration, max_attempts: u32) -> Self {
        self.initial_backoff = initial;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    /// A fresh copy of the reply-poll schedule
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_backoff, self.max_poll_attempts)
    }

    // =========================================================================
    // Fire-and-forget
    // =========================================================================

    /// Speak `text` with the client's default settings
    ///
    /// Empty text is a no-op and opens no connection.
    pub fn talk(&self, text: &str) -> Result<()> {
        self.talk_with(text, self.settings)
    }

    /// Speak `text` with explicit settings
    pub fn talk_with(&self, text: &str, settings: VoiceSettings) -> Result<()> {
        if text.is_empty() {
            tracing::trace!("Skipping empty talk");
            return Ok(());
        }

        let bytes = encode_talk(&TalkParameters::new(text, settings))?;
        self.send(Command::Talk, &bytes)
    }

    pub fn pause(&self) -> Result<()> {
        self.send_simple(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send_simple(Command::Resume)
    }

    /// Drop the line being spoken and move to the next
    pub fn skip(&self) -> Result<()> {
        self.send_simple(Command::Skip)
    }

    /// Drop every queued line
    pub fn clear(&self) -> Result<()> {
        self.send_simple(Command::Clear)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether the peer is paused (1) or not (0)
    pub fn get_pause(&self) -> PendingRequest {
        self.query(Command::GetPause)
    }

    /// Whether the peer is speaking (1) or idle (0)
    pub fn get_now_playing(&self) -> PendingRequest {
        self.query(Command::GetNowPlaying)
    }

    /// Number of lines waiting to be spoken
    pub fn get_task_count(&self) -> PendingRequest {
        self.query(Command::GetTaskCount)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn send_simple(&self, command: Command) -> Result<()> {
        let bytes = encode_simple(command)?;
        self.send(command, &bytes)
    }

    fn send(&self, command: Command, bytes: &[u8]) -> Result<()> {
        tracing::debug!("Sending {} to {}", command, self.addr);
        transport::send_bytes(&self.addr, bytes, self.connect_timeout)
    }

    fn query(&self, command: Command) -> PendingRequest {
        PendingRequest::spawn(
            command,
            self.addr.clone(),
            self.connect_timeout,
            self.backoff(),
        )
    }
}

/// Text always goes out as UTF-8; other selectors only change how the peer reads it
fn warn_if_not_utf8(encoding: TextEncoding) {
    if encoding != TextEncoding::Utf8 {
        tracing::warn!(
            "Text encoding selector {:?} is sent as-is but text is always UTF-8; the peer may read it garbled",
            encoding
        );
    }
}
