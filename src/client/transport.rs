//! TCP transport
//!
//! Every command gets its own short-lived connection.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, TalkError};

/// Open a connection to `addr` (`host:port`)
///
/// Tries every resolved address in turn; a zero timeout means the OS default.
pub(crate) fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let candidates = addr
        .to_socket_addrs()
        .map_err(|e| TalkError::connection(addr, e))?;

    let mut last_err = None;
    for sock_addr in candidates {
        let attempt = if timeout.is_zero() {
            TcpStream::connect(sock_addr)
        } else {
            TcpStream::connect_timeout(&sock_addr, timeout)
        };

        match attempt {
            Ok(stream) => {
                // Requests are tiny; send them immediately
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => {
                tracing::trace!("Connect to {} failed: {}", sock_addr, e);
                last_err = Some(e);
            }
        }
    }

    let source = last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "address resolved to nothing",
        )
    });
    Err(TalkError::connection(addr, source))
}

/// Connect, write `bytes`, close
///
/// Returns once the bytes are handed to the OS; the peer acting on them is
/// not confirmed.
pub fn send_bytes(addr: &str, bytes: &[u8], timeout: Duration) -> Result<()> {
    let mut stream = connect(addr, timeout)?;
    if !timeout.is_zero() {
        stream.set_write_timeout(Some(timeout))?;
    }

    stream
        .write_all(bytes)
        .and_then(|_| stream.flush())
        .map_err(|e| TalkError::connection(addr, e))?;

    tracing::trace!("Sent {} bytes to {}", bytes.len(), addr);
    Ok(())
}
