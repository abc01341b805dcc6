//! Protocol Module
//!
//! Defines the binary command protocol spoken by the speech application.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬────────────────────────────────────────┐
//! │ Op (2)   │   Payload (Talk only, see codec)       │
//! └──────────┴────────────────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x0001: TALK            - Payload: voice settings + text
//! - 0x0010: PAUSE
//! - 0x0020: RESUME
//! - 0x0030: SKIP
//! - 0x0040: CLEAR
//! - 0x0110: GET_PAUSE       - Reply: 1 byte
//! - 0x0120: GET_NOW_PLAYING - Reply: 1 byte
//! - 0x0130: GET_TASK_COUNT  - Reply: 4 bytes
//!
//! ### Reply Format
//! Unframed big-endian integer; its length (1, 2 or 4) gives its width.
//! One command is sent per connection.

mod command;
mod response;
mod codec;

pub use command::{
    Command, Request, TalkParameters, TextEncoding, VoiceSettings, PEER_DEFAULT,
    PEER_DEFAULT_VOICE,
};
pub use response::{Reply, MAX_REPLY_SIZE};
pub use codec::{
    encode_reply, encode_simple, encode_talk, read_request, MAX_TEXT_SIZE, OPCODE_SIZE,
    TALK_HEADER_SIZE,
};
