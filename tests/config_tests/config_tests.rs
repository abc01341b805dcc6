//! Tests for Config
//!
//! These tests verify:
//! - Defaults and builder
//! - JSON save/load, including Bouyomichan envelope files
//! - Validation of loaded values

use std::fs;
use std::time::Duration;

use talkwire::config::Config;
use talkwire::protocol::{TextEncoding, VoiceSettings};
use talkwire::TalkError;
use tempfile::TempDir;

// =============================================================================
// Defaults and Builder Tests
// =============================================================================

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 50001);
    assert_eq!(config.addr(), "127.0.0.1:50001");
    assert_eq!(config.text_encoding, TextEncoding::Utf8);
    assert_eq!(config.voice, 0);
    assert_eq!(config.volume, -1);
    assert_eq!(config.speed, -1);
    assert_eq!(config.tone, -1);
    assert_eq!(config.initial_backoff(), Duration::from_millis(1));
    assert_eq!(config.max_poll_attempts, 10);
    assert!(config.validate().is_ok());
}

#[test]
fn test_builder_overrides() {
    let config = Config::builder()
        .host("192.168.0.10")
        .port(50080)
        .voice(2)
        .volume(80)
        .speed(120)
        .tone(95)
        .text_encoding(TextEncoding::Utf16)
        .connect_timeout_ms(250)
        .initial_backoff_ms(5)
        .max_poll_attempts(3)
        .build();

    assert_eq!(config.addr(), "192.168.0.10:50080");
    assert_eq!(config.connect_timeout(), Duration::from_millis(250));
    assert_eq!(config.initial_backoff(), Duration::from_millis(5));
    assert_eq!(config.max_poll_attempts, 3);
    assert_eq!(
        config.voice_settings(),
        VoiceSettings {
            encoding: TextEncoding::Utf16,
            voice: 2,
            volume: 80,
            speed: 120,
            tone: 95,
        }
    );
}

#[test]
fn test_builder_voice_settings() {
    let settings = VoiceSettings {
        encoding: TextEncoding::ShiftJis,
        voice: 7,
        volume: 10,
        speed: 20,
        tone: 30,
    };
    let config = Config::builder().voice_settings(settings).build();

    assert_eq!(config.voice_settings(), settings);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_rejects_bad_values() {
    let cases = [
        Config::builder().port(0).build(),
        Config::builder().host("  ").build(),
        Config::builder().initial_backoff_ms(0).build(),
        Config::builder().max_poll_attempts(0).build(),
    ];

    for config in cases {
        assert!(
            matches!(config.validate(), Err(TalkError::Config(_))),
            "{:?} should be rejected",
            config
        );
    }
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");

    let config = Config::builder().port(50002).voice(3).tone(110).build();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config").join("nested").join("talkwire.json");

    Config::default().save(&path).unwrap();

    assert!(path.exists());
}

#[test]
fn test_saved_json_uses_selector_byte() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");

    Config::builder()
        .text_encoding(TextEncoding::ShiftJis)
        .build()
        .save(&path)
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap())
        .unwrap();
    assert_eq!(json["text_encoding"], 2);
    assert_eq!(json["port"], 50001);
}

#[test]
fn test_load_partial_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");
    fs::write(&path, r#"{ "host": "10.0.0.5", "volume": 60 }"#).unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.host, "10.0.0.5");
    assert_eq!(config.volume, 60);
    assert_eq!(config.port, 50001);
    assert_eq!(config.speed, -1);
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = Config::load(temp_dir.path().join("absent.json"));

    assert!(matches!(result, Err(TalkError::Io(_))));
}

#[test]
fn test_load_invalid_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        Config::load(&path),
        Err(TalkError::Serialization(_))
    ));
}

#[test]
fn test_load_rejects_unknown_encoding() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");
    fs::write(&path, r#"{ "text_encoding": 7 }"#).unwrap();

    assert!(matches!(
        Config::load(&path),
        Err(TalkError::Serialization(_))
    ));
}

#[test]
fn test_load_validates_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");
    fs::write(&path, r#"{ "port": 0 }"#).unwrap();

    assert!(matches!(Config::load(&path), Err(TalkError::Config(_))));
}

#[test]
fn test_load_bouyomichan_envelope() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bouyomichan.json");
    fs::write(
        &path,
        r#"{
            "BouyomichanConfig": {
                "Host": "192.168.1.20",
                "Port": 50080,
                "ByteCode": 0,
                "Voice": 1,
                "Volume": 70,
                "Speed": 120,
                "Tone": 100
            }
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.addr(), "192.168.1.20:50080");
    assert_eq!(
        config.voice_settings(),
        VoiceSettings {
            encoding: TextEncoding::Utf8,
            voice: 1,
            volume: 70,
            speed: 120,
            tone: 100,
        }
    );
    assert_eq!(config.max_poll_attempts, 10);
}

#[test]
fn test_load_bouyomichan_envelope_with_nulls() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bouyomichan.json");
    fs::write(
        &path,
        r#"{ "BouyomichanConfig": { "Host": "localhost", "Port": null, "ByteCode": null, "Voice": 3, "Volume": null, "Speed": null, "Tone": null } }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.host, "localhost");
    assert_eq!(config.port, 50001);
    assert_eq!(config.voice, 3);
    assert_eq!(config.volume, -1);
    assert_eq!(config.text_encoding, TextEncoding::Utf8);
}

#[test]
fn test_load_flat_file_with_null_field() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");
    fs::write(&path, r#"{ "port": 50002, "tone": null }"#).unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.port, 50002);
    assert_eq!(config.tone, -1);
}

#[test]
fn test_saved_file_stays_flat() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("talkwire.json");
    Config::default().save(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap())
        .unwrap();
    assert!(json.get("BouyomichanConfig").is_none());
    assert!(json.get("host").is_some());
}
