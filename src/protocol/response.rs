//! Reply definitions
//!
//! The raw bytes a peer sends back for a query, and their decoding.

use bytes::{Buf, Bytes};

use crate::error::{Result, TalkError};

/// Widest reply a peer sends; anything longer cannot be decoded
pub const MAX_REPLY_SIZE: usize = 4;

/// Raw reply bytes accumulated from the socket for one query
///
/// The width of the integer is implied by the length; byte order is
/// always big-endian regardless of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    bytes: Bytes,
}

impl Reply {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Interpret the reply as an integer
    ///
    /// 1 byte is read unsigned, 2 and 4 bytes as signed big-endian.
    pub fn decode(&self) -> Result<i32> {
        let mut buf = self.bytes.clone();
        match buf.len() {
            1 => Ok(buf.get_u8() as i32),
            2 => Ok(buf.get_i16() as i32),
            4 => Ok(buf.get_i32()),
            len => Err(TalkError::Decode { len }),
        }
    }
}
