//! Command definitions
//!
//! Opcodes and the parameter bundle carried by `Talk`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TalkError};

/// Sentinel for volume/speed/tone meaning "use the peer's own setting"
pub const PEER_DEFAULT: i16 = -1;

/// Voice id the peer maps to the voice selected in its own UI
pub const PEER_DEFAULT_VOICE: i16 = 0;

/// Protocol opcodes
///
/// Values are fixed by the speech application and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    Talk = 0x0001,
    Pause = 0x0010,
    Resume = 0x0020,
    Skip = 0x0030,
    Clear = 0x0040,
    GetPause = 0x0110,
    GetNowPlaying = 0x0120,
    GetTaskCount = 0x0130,
}

impl Command {
    /// All opcodes, in protocol order
    pub const ALL: [Command; 8] = [
        Command::Talk,
        Command::Pause,
        Command::Resume,
        Command::Skip,
        Command::Clear,
        Command::GetPause,
        Command::GetNowPlaying,
        Command::GetTaskCount,
    ];

    /// The 16-bit opcode
    pub fn code(self) -> u16 {
        self as u16
    }

    /// True for commands the peer answers with a value
    pub fn is_query(self) -> bool {
        self.reply_width().is_some()
    }

    /// Width in bytes of the peer's reply, `None` for fire-and-forget commands
    pub fn reply_width(self) -> Option<usize> {
        match self {
            Command::GetPause | Command::GetNowPlaying => Some(1),
            Command::GetTaskCount => Some(4),
            _ => None,
        }
    }
}

impl TryFrom<u16> for Command {
    type Error = TalkError;

    fn try_from(code: u16) -> Result<Self> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.code() == code)
            .ok_or_else(|| TalkError::Protocol(format!("Unknown opcode: 0x{:04x}", code)))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(0x{:04x})", self, self.code())
    }
}

/// Text-encoding selector byte sent with `Talk`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TextEncoding {
    #[default]
    Utf8 = 0,
    Utf16 = 1,
    ShiftJis = 2,
}

impl TryFrom<u8> for TextEncoding {
    type Error = TalkError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(TextEncoding::Utf8),
            1 => Ok(TextEncoding::Utf16),
            2 => Ok(TextEncoding::ShiftJis),
            other => Err(TalkError::Protocol(format!(
                "Unknown text encoding selector: {}",
                other
            ))),
        }
    }
}

impl From<TextEncoding> for u8 {
    fn from(encoding: TextEncoding) -> u8 {
        encoding as u8
    }
}

/// Voice settings applied to a spoken line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSettings {
    pub encoding: TextEncoding,
    pub voice: i16,
    pub volume: i16,
    pub speed: i16,
    pub tone: i16,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::Utf8,
            voice: PEER_DEFAULT_VOICE,
            volume: PEER_DEFAULT,
            speed: PEER_DEFAULT,
            tone: PEER_DEFAULT,
        }
    }
}

/// Everything a `Talk` command carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkParameters {
    pub text: String,
    pub settings: VoiceSettings,
}

impl TalkParameters {
    pub fn new(text: impl Into<String>, settings: VoiceSettings) -> Self {
        Self {
            text: text.into(),
            settings,
        }
    }
}

/// A request as decoded on the peer side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Opcode-only command (control or query)
    Simple(Command),

    /// Speak a line
    Talk(TalkParameters),
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::Simple(cmd) => *cmd,
            Request::Talk(_) => Command::Talk,
        }
    }
}
