//! Pending query
//!
//! A value-returning command runs on its own worker thread with its own
//! socket. The caller keeps a [`PendingRequest`] and collects the
//! [`Outcome`] whenever it wants.
//!
//! ## Worker State Machine
//! ```text
//!  Connecting ──► RequestSent ──► Polling ──► Decoding ──► Success(value)
//!      │                            │  ▲          │
//!      ▼                            │  │ backoff  ▼
//!    Fault ◄────────────────────────┤  │        Fault (decode)
//!                                   ├──┘
//!                                   ├──► Cancelled
//!                                   └──► Timeout (schedule exhausted)
//! ```

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use crossbeam::channel::{bounded, select, Receiver, Sender, TryRecvError};

use super::backoff::Backoff;
use super::transport;
use crate::error::{Result, TalkError};
use crate::protocol::{encode_simple, Command, Reply, MAX_REPLY_SIZE};

/// Value reported for a query that produced no usable answer
pub const NO_RESULT: i32 = -1;

/// Terminal state of a query
#[derive(Debug)]
pub enum Outcome {
    /// The peer answered
    Success(i32),

    /// No reply before the backoff schedule ran out
    Timeout,

    /// The caller cancelled before a reply arrived
    Cancelled,

    /// Connecting, writing, reading or decoding failed
    Fault(TalkError),
}

impl Outcome {
    /// The decoded value, if any
    pub fn value(&self) -> Option<i32> {
        match self {
            Outcome::Success(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Collapse into the sentinel form: timeout and cancel become `NO_RESULT`,
    /// faults become errors.
    pub fn into_result(self) -> Result<i32> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Timeout | Outcome::Cancelled => Ok(NO_RESULT),
            Outcome::Fault(e) => Err(e),
        }
    }
}

/// An in-flight value-returning command
///
/// Dropping an unfinished request cancels it.
pub struct PendingRequest {
    command: Command,
    addr: String,
    cancel_tx: Sender<()>,
    done_rx: Receiver<Outcome>,
    completed: Arc<AtomicBool>,
}

impl PendingRequest {
    /// Start the query immediately on a worker thread
    pub(crate) fn spawn(
        command: Command,
        addr: String,
        connect_timeout: Duration,
        backoff: Backoff,
    ) -> Self {
        let (cancel_tx, cancel_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let completed = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            command,
            addr: addr.clone(),
            connect_timeout,
            backoff,
            cancel_rx,
        };
        let worker_done = done_tx.clone();
        let worker_completed = Arc::clone(&completed);

        let spawned = thread::Builder::new()
            .name(format!("talkwire-{:?}", command))
            .spawn(move || {
                let outcome = worker.run();
                worker_completed.store(true, Ordering::Release);
                let _ = worker_done.send(outcome);
            });

        if let Err(e) = spawned {
            tracing::warn!("Could not start worker for {}: {}", command, e);
            completed.store(true, Ordering::Release);
            let _ = done_tx.send(Outcome::Fault(TalkError::Io(e)));
        }

        Self {
            command,
            addr,
            cancel_tx,
            done_rx,
            completed,
        }
    }

    /// The command this request queries
    pub fn command(&self) -> Command {
        self.command
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// True once the worker reached a terminal state
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Ask the worker to stop at its next poll boundary
    ///
    /// No effect once the request has completed.
    pub fn cancel(&self) {
        if self.cancel_tx.try_send(()).is_ok() {
            tracing::debug!("Cancel requested for {} to {}", self.command, self.addr);
        }
    }

    /// Block until the request completes
    pub fn wait(self) -> Outcome {
        self.done_rx
            .recv()
            .unwrap_or(Outcome::Fault(TalkError::WorkerLost))
    }

    /// Block until the request completes; `NO_RESULT` on timeout or cancel
    pub fn result(self) -> Result<i32> {
        self.wait().into_result()
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("command", &self.command)
            .field("addr", &self.addr)
            .field("completed", &self.is_completed())
            .finish()
    }
}

// =============================================================================
// Worker
// =============================================================================

struct Worker {
    command: Command,
    addr: String,
    connect_timeout: Duration,
    backoff: Backoff,
    cancel_rx: Receiver<()>,
}

impl Worker {
    fn run(mut self) -> Outcome {
        tracing::debug!("Query {} to {} started", self.command, self.addr);

        let outcome = match self.exchange() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Query {} to {} failed: {}", self.command, self.addr, e);
                Outcome::Fault(e)
            }
        };

        tracing::debug!(
            "Query {} to {} finished after {} backoff steps: {:?}",
            self.command,
            self.addr,
            self.backoff.attempts(),
            outcome
        );
        outcome
    }

    /// Connect, send the opcode, poll for the reply
    ///
    /// The socket is closed on every return path when `stream` drops.
    fn exchange(&mut self) -> Result<Outcome> {
        let request = encode_simple(self.command)?;
        let mut stream = transport::connect(&self.addr, self.connect_timeout)?;

        stream
            .write_all(&request)
            .map_err(|e| TalkError::connection(&self.addr, e))?;
        stream.set_nonblocking(true)?;

        let mut reply = BytesMut::new();
        let mut cancelled = false;

        loop {
            drain(&mut stream, &mut reply).map_err(|e| TalkError::connection(&self.addr, e))?;

            if !reply.is_empty() {
                let reply = Reply::new(reply.freeze());
                return reply.decode().map(Outcome::Success);
            }

            if cancelled || self.cancel_requested() {
                return Ok(Outcome::Cancelled);
            }

            let Some(delay) = self.backoff.next() else {
                let _ = stream.shutdown(Shutdown::Both);
                tracing::debug!("No reply from {} for {}", self.addr, self.command);
                return Ok(Outcome::Timeout);
            };

            tracing::trace!(
                "No reply yet for {}, waiting {:?} (step {})",
                self.command,
                delay,
                self.backoff.attempts()
            );

            // A disconnected cancel channel means the caller dropped the request
            select! {
                recv(self.cancel_rx) -> _ => cancelled = true,
                default(delay) => {}
            }
        }
    }

    fn cancel_requested(&self) -> bool {
        match self.cancel_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

/// Read everything currently available without blocking
///
/// Replies have no length prefix: whatever has arrived by the time a read
/// would block is taken as the whole reply. A reply split across TCP
/// segments can therefore be cut short.
///
/// Stops one byte past [`MAX_REPLY_SIZE`]; a longer reply is undecodable
/// whatever follows.
fn drain(stream: &mut TcpStream, reply: &mut BytesMut) -> std::io::Result<()> {
    let mut buf = [0u8; MAX_REPLY_SIZE + 1];
    while reply.len() <= MAX_REPLY_SIZE {
        let want = MAX_REPLY_SIZE + 1 - reply.len();
        match stream.read(&mut buf[..want]) {
            // Peer closed its side
            Ok(0) => return Ok(()),
            Ok(n) => reply.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
