//! Connection Handler
//!
//! Handles a single client connection: one request, at most one reply.

use std::io::{BufReader, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::server::PeerConfig;
use super::state::PeerState;
use crate::error::{Result, TalkError};
use crate::protocol::{encode_reply, read_request, Request};

/// Read slice while holding a silent connection open
const HOLD_POLL: Duration = Duration::from_millis(20);

/// Handles a single client connection
pub struct Connection {
    /// TCP stream (buffered for request reads)
    reader: BufReader<TcpStream>,

    /// Shared peer state
    state: Arc<PeerState>,

    /// Behaviour switches
    config: PeerConfig,

    /// Set when the peer is shutting down
    shutdown: Arc<AtomicBool>,

    /// Client address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        state: Arc<PeerState>,
        config: PeerConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }

        Ok(Self {
            reader: BufReader::new(stream),
            state,
            config,
            shutdown,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until the request is served)
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let request = match read_request(&mut self.reader) {
            Ok(request) => request,
            Err(TalkError::Io(ref e)) if is_disconnect(e.kind()) => {
                tracing::debug!("Client {} left before sending a request", self.peer_addr);
                return Ok(());
            }
            Err(TalkError::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                tracing::debug!("Read timeout for client {}", self.peer_addr);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                return Err(e);
            }
        };

        let command = request.command();
        if let Request::Talk(ref params) = request {
            tracing::info!("Queued line from {}: {:?}", self.peer_addr, params.text);
        } else {
            tracing::debug!("Received {} from {}", command, self.peer_addr);
        }

        let Some(value) = self.state.apply(request) else {
            return Ok(());
        };

        if self.config.silent {
            self.hold_open();
            return Ok(());
        }

        if self.config.reply_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.reply_delay_ms));
        }

        // Query commands always have a width
        let width = command.reply_width().unwrap_or(4);
        let reply = encode_reply(value, width)?;

        let stream = self.reader.get_mut();
        if let Err(e) = stream.write_all(&reply).and_then(|_| stream.flush()) {
            if is_disconnect(e.kind()) {
                tracing::debug!(
                    "Client {} disconnected before reply could be sent: {}",
                    self.peer_addr,
                    e
                );
                return Ok(());
            }
            tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
            return Err(e.into());
        }

        tracing::trace!("Replied {} to {} with {}", command, self.peer_addr, value);
        Ok(())
    }

    /// Keep the socket open without replying until the client goes away
    fn hold_open(&mut self) {
        let stream = self.reader.get_mut();
        if stream.set_read_timeout(Some(HOLD_POLL)).is_err() {
            return;
        }

        let mut buf = [0u8; 64];
        while !self.shutdown.load(Ordering::Acquire) {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue
                }
                Err(_) => break,
            }
        }
        tracing::debug!("Silent connection from {} closed", self.peer_addr);
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
