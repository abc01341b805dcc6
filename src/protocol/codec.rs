//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────┬─────────┬──────────┬──────────┐
//! │ Op (2)   │ Speed(2) │ Tone (2) │ Vol (2)  │ Voice(2) │ Enc (1) │ Len (4)  │  Text    │
//! └──────────┴──────────┴──────────┴──────────┴──────────┴─────────┴──────────┴──────────┘
//!  every request        └──────────────────────── Talk only ────────────────────────────┘
//! ```
//! Request integers are little-endian.
//!
//! ## Reply Format
//! A bare big-endian integer of 1, 2 or 4 bytes with no framing.

use std::io::Read;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Command, Request, TalkParameters, TextEncoding, VoiceSettings};
use crate::error::{Result, TalkError};

/// Opcode size on the wire
pub const OPCODE_SIZE: usize = 2;

/// Talk header: opcode + speed + tone + volume + voice + encoding + text length
pub const TALK_HEADER_SIZE: usize = OPCODE_SIZE + 4 * 2 + 1 + 4;

/// Maximum text payload (16 MB)
pub const MAX_TEXT_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// Request Encoding
// =============================================================================

/// Encode an opcode-only command
///
/// `Talk` needs parameters and is rejected; use [`encode_talk`].
pub fn encode_simple(command: Command) -> Result<Bytes> {
    if command == Command::Talk {
        return Err(TalkError::Protocol(
            "Talk cannot be encoded without parameters".to_string(),
        ));
    }

    let mut buf = BytesMut::with_capacity(OPCODE_SIZE);
    buf.put_u16_le(command.code());
    Ok(buf.freeze())
}

/// Encode a `Talk` command
///
/// The text is always sent as UTF-8; the encoding selector is forwarded as-is.
pub fn encode_talk(params: &TalkParameters) -> Result<Bytes> {
    let text = params.text.as_bytes();
    if text.len() > MAX_TEXT_SIZE {
        return Err(TalkError::Protocol(format!(
            "Text too large: {} bytes (max {})",
            text.len(),
            MAX_TEXT_SIZE
        )));
    }

    let settings = &params.settings;
    let mut buf = BytesMut::with_capacity(TALK_HEADER_SIZE + text.len());
    buf.put_u16_le(Command::Talk.code());
    buf.put_i16_le(settings.speed);
    buf.put_i16_le(settings.tone);
    buf.put_i16_le(settings.volume);
    buf.put_i16_le(settings.voice);
    buf.put_u8(settings.encoding.into());
    buf.put_u32_le(text.len() as u32);
    buf.put_slice(text);

    Ok(buf.freeze())
}

// =============================================================================
// Request Decoding (peer side)
// =============================================================================

/// Read one complete request from a stream
///
/// Blocks until the request is received or an error occurs.
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let mut opcode = [0u8; OPCODE_SIZE];
    reader.read_exact(&mut opcode)?;

    let command = Command::try_from(u16::from_le_bytes(opcode))?;
    if command != Command::Talk {
        return Ok(Request::Simple(command));
    }

    let mut header = [0u8; TALK_HEADER_SIZE - OPCODE_SIZE];
    reader.read_exact(&mut header)?;

    let mut fields = &header[..];
    let speed = fields.get_i16_le();
    let tone = fields.get_i16_le();
    let volume = fields.get_i16_le();
    let voice = fields.get_i16_le();
    let encoding = TextEncoding::try_from(fields.get_u8())?;
    let text_len = fields.get_u32_le() as usize;

    if text_len > MAX_TEXT_SIZE {
        return Err(TalkError::Protocol(format!(
            "Text too large: {} bytes (max {})",
            text_len, MAX_TEXT_SIZE
        )));
    }

    let mut text = vec![0u8; text_len];
    reader.read_exact(&mut text)?;
    let text = String::from_utf8(text)
        .map_err(|e| TalkError::Protocol(format!("Talk text is not UTF-8: {}", e)))?;

    Ok(Request::Talk(TalkParameters {
        text,
        settings: VoiceSettings {
            encoding,
            voice,
            volume,
            speed,
            tone,
        },
    }))
}

// =============================================================================
// Reply Encoding (peer side)
// =============================================================================

/// Encode a reply value as a big-endian integer of `width` bytes
///
/// Values are truncated to the width.
pub fn encode_reply(value: i32, width: usize) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(width);
    match width {
        1 => buf.put_u8(value as u8),
        2 => buf.put_i16(value as i16),
        4 => buf.put_i32(value),
        _ => {
            return Err(TalkError::Protocol(format!(
                "Unsupported reply width: {} bytes",
                width
            )))
        }
    }
    Ok(buf.freeze())
}
