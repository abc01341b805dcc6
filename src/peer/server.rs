//! TCP Server
//!
//! Accepts connections and hands each one to its own handler thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::connection::Connection;
use super::state::PeerState;
use crate::client::Client;
use crate::error::{Result, TalkError};

/// How often the accept loop and playback worker look at the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Loopback peer configuration
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// TCP listen address (use port 0 for a random port)
    pub listen_addr: String,

    /// Delay before every reply (milliseconds)
    pub reply_delay_ms: u64,

    /// Accept queries but never answer them
    pub silent: bool,

    /// Retire the head of the queue this often while not paused (0 = never)
    pub playback_ms: u64,

    /// Request read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:50001".to_string(),
            reply_delay_ms: 0,
            silent: false,
            playback_ms: 0,
            read_timeout_ms: 5000,
        }
    }
}

impl PeerConfig {
    pub fn builder() -> PeerConfigBuilder {
        PeerConfigBuilder::default()
    }
}

/// Builder for PeerConfig
#[derive(Default)]
pub struct PeerConfigBuilder {
    config: PeerConfig,
}

impl PeerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Delay every reply (in milliseconds)
    pub fn reply_delay_ms(mut self, ms: u64) -> Self {
        self.config.reply_delay_ms = ms;
        self
    }

    /// Never answer queries
    pub fn silent(mut self, silent: bool) -> Self {
        self.config.silent = silent;
        self
    }

    /// Pretend to finish a line every `ms` milliseconds
    pub fn playback_ms(mut self, ms: u64) -> Self {
        self.config.playback_ms = ms;
        self
    }

    /// Set the request read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn build(self) -> PeerConfig {
        self.config
    }
}

/// In-process stand-in for the speech application
pub struct Peer {
    config: PeerConfig,
    listener: TcpListener,
    state: Arc<PeerState>,
    shutdown: Arc<AtomicBool>,
}

impl Peer {
    /// Bind the listen socket
    pub fn bind(config: PeerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)
            .map_err(|e| TalkError::connection(config.listen_addr.as_str(), e))?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            listener,
            state: Arc::new(PeerState::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> Arc<PeerState> {
        Arc::clone(&self.state)
    }

    /// Serve until [`Peer::shutdown`] is called (blocking)
    ///
    /// Handler threads are joined before returning.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Peer listening on {}", self.local_addr()?);

        thread::scope(|scope| {
            if self.config.playback_ms > 0 {
                scope.spawn(|| self.playback());
            }

            while !self.shutdown.load(Ordering::Acquire) {
                let (stream, addr) = match self.listener.accept() {
                    Ok(accepted) => accepted,
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        thread::sleep(SHUTDOWN_POLL);
                        continue;
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        thread::sleep(SHUTDOWN_POLL);
                        continue;
                    }
                };

                self.state.record_connection();

                // Accepted sockets may inherit the listener's non-blocking mode
                if let Err(e) = stream.set_nonblocking(false) {
                    tracing::warn!("Dropping connection from {}: {}", addr, e);
                    continue;
                }

                let connection = match Connection::new(
                    stream,
                    Arc::clone(&self.state),
                    self.config.clone(),
                    Arc::clone(&self.shutdown),
                ) {
                    Ok(connection) => connection,
                    Err(e) => {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                };

                scope.spawn(move || {
                    if let Err(e) = connection.handle() {
                        tracing::warn!("Connection from {} ended with error: {}", addr, e);
                    }
                });
            }
        });

        tracing::info!("Peer stopped");
        Ok(())
    }

    /// Serve on a background thread
    pub fn spawn(self) -> Result<PeerHandle> {
        let addr = self.local_addr()?;
        let state = self.state();
        let shutdown = Arc::clone(&self.shutdown);

        let thread = thread::Builder::new()
            .name("talkwire-peer".to_string())
            .spawn(move || self.run())?;

        Ok(PeerHandle {
            addr,
            state,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Retire queued lines at the configured pace
    fn playback(&self) {
        let interval = Duration::from_millis(self.config.playback_ms);
        let mut next = Instant::now() + interval;

        while !self.shutdown.load(Ordering::Acquire) {
            let now = Instant::now();
            if now < next {
                thread::sleep((next - now).min(SHUTDOWN_POLL));
                continue;
            }
            next = now + interval;

            if self.state.is_paused() {
                continue;
            }
            if let Some(line) = self.state.retire_head() {
                tracing::info!("Spoke: {:?}", line.text);
            }
        }
    }
}

/// A peer running on a background thread; stops when dropped
pub struct PeerHandle {
    addr: SocketAddr,
    state: Arc<PeerState>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl PeerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &PeerState {
        &self.state
    }

    /// A client pointed at this peer
    pub fn client(&self) -> Client {
        Client::new(self.addr.ip().to_string(), self.addr.port())
    }

    /// Stop the peer and wait for it
    pub fn stop(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| TalkError::WorkerLost)?,
            None => Ok(()),
        }
    }
}

impl Drop for PeerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            tracing::warn!("Peer on {} stopped with error: {}", self.addr, e);
        }
    }
}
