//! Configuration for talkwire
//!
//! Centralized configuration with sensible defaults, persisted as JSON.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TalkError};
use crate::protocol::{TextEncoding, VoiceSettings, PEER_DEFAULT, PEER_DEFAULT_VOICE};

/// Envelope key of config files written by the Bouyomichan sender tools
const ENVELOPE_KEY: &str = "BouyomichanConfig";

/// Main configuration for a talkwire client
///
/// Saved as flat snake_case JSON. [`Config::load`] also reads the
/// `{"BouyomichanConfig": {"Host": ..., "ByteCode": ...}}` shape, where any
/// field may be `null` to keep its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Peer Address
    // -------------------------------------------------------------------------
    /// Host running the speech application
    #[serde(alias = "Host")]
    pub host: String,

    /// Command port of the speech application
    #[serde(alias = "Port")]
    pub port: u16,

    // -------------------------------------------------------------------------
    // Default Voice Settings
    // -------------------------------------------------------------------------
    /// Encoding selector sent with every line
    #[serde(alias = "ByteCode")]
    pub text_encoding: TextEncoding,

    /// Voice id (0 = the voice selected in the peer's UI)
    #[serde(alias = "Voice")]
    pub voice: i16,

    /// Volume (-1 = peer default)
    #[serde(alias = "Volume")]
    pub volume: i16,

    /// Speed (-1 = peer default)
    #[serde(alias = "Speed")]
    pub speed: i16,

    /// Tone (-1 = peer default)
    #[serde(alias = "Tone")]
    pub tone: i16,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// First backoff delay while waiting for a reply (milliseconds)
    pub initial_backoff_ms: u64,

    /// Poll attempts before a query gives up
    pub max_poll_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50001,
            text_encoding: TextEncoding::Utf8,
            voice: PEER_DEFAULT_VOICE,
            volume: PEER_DEFAULT,
            speed: PEER_DEFAULT,
            tone: PEER_DEFAULT,
            connect_timeout_ms: 3000,
            initial_backoff_ms: 1,
            max_poll_attempts: 10,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json(&contents)
            .map_err(|e| TalkError::Serialization(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse either config shape; unvalidated
    fn from_json(contents: &str) -> serde_json::Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(contents)?;

        if let Some(inner) = value.get_mut(ENVELOPE_KEY).map(serde_json::Value::take) {
            value = inner;
        }
        if let serde_json::Value::Object(fields) = &mut value {
            fields.retain(|_, v| !v.is_null());
        }

        serde_json::from_value(value)
    }

    /// Save as pretty-printed JSON, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TalkError::Serialization(e.to_string()))?;
        fs::write(path, json)?;

        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Reject values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TalkError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(TalkError::Config("port must not be 0".to_string()));
        }
        if self.initial_backoff_ms == 0 {
            return Err(TalkError::Config(
                "initial_backoff_ms must be at least 1".to_string(),
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(TalkError::Config(
                "max_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` of the peer
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default voice settings for spoken lines
    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            encoding: self.text_encoding,
            voice: self.voice,
            volume: self.volume,
            speed: self.speed,
            tone: self.tone,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the peer host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the peer port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set all default voice settings at once
    pub fn voice_settings(mut self, settings: VoiceSettings) -> Self {
        self.config.text_encoding = settings.encoding;
        self.config.voice = settings.voice;
        self.config.volume = settings.volume;
        self.config.speed = settings.speed;
        self.config.tone = settings.tone;
        self
    }

    pub fn text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.config.text_encoding = encoding;
        self
    }

    pub fn voice(mut self, voice: i16) -> Self {
        self.config.voice = voice;
        self
    }

    pub fn volume(mut self, volume: i16) -> Self {
        self.config.volume = volume;
        self
    }

    pub fn speed(mut self, speed: i16) -> Self {
        self.config.speed = speed;
        self
    }

    pub fn tone(mut self, tone: i16) -> Self {
        self.config.tone = tone;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the first reply-poll backoff (in milliseconds)
    pub fn initial_backoff_ms(mut self, ms: u64) -> Self {
        self.config.initial_backoff_ms = ms;
        self
    }

    /// Set the number of reply polls before a query times out
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.max_poll_attempts = attempts;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
