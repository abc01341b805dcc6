//! Peer state
//!
//! What the loopback peer remembers between connections: the queue of
//! lines to speak, the pause flag and some counters for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::protocol::{Command, Request, VoiceSettings};

/// A queued line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub settings: VoiceSettings,
}

/// Shared state of a loopback peer
#[derive(Debug, Default)]
pub struct PeerState {
    queue: Mutex<VecDeque<Utterance>>,
    paused: AtomicBool,
    connections: AtomicUsize,
    requests: Mutex<HashMap<Command, usize>>,
}

impl PeerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a request and return the value to reply with, if the request is a query
    pub fn apply(&self, request: Request) -> Option<i32> {
        *self.requests.lock().entry(request.command()).or_insert(0) += 1;

        match request {
            Request::Talk(params) => {
                self.queue.lock().push_back(Utterance {
                    text: params.text,
                    settings: params.settings,
                });
                None
            }
            Request::Simple(Command::Pause) => {
                self.paused.store(true, Ordering::Release);
                None
            }
            Request::Simple(Command::Resume) => {
                self.paused.store(false, Ordering::Release);
                None
            }
            Request::Simple(Command::Skip) => {
                self.queue.lock().pop_front();
                None
            }
            Request::Simple(Command::Clear) => {
                self.queue.lock().clear();
                None
            }
            Request::Simple(Command::GetPause) => Some(self.is_paused() as i32),
            Request::Simple(Command::GetNowPlaying) => Some(self.is_playing() as i32),
            Request::Simple(Command::GetTaskCount) => Some(self.task_count() as i32),
            // Decoding never yields a bare Talk
            Request::Simple(Command::Talk) => None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Speaking means a line is queued and the peer is not paused
    pub fn is_playing(&self) -> bool {
        !self.is_paused() && !self.queue.lock().is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Snapshot of the queued lines, head first
    pub fn queued(&self) -> Vec<Utterance> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Remove the line at the head of the queue, as if it finished playing
    pub fn retire_head(&self) -> Option<Utterance> {
        self.queue.lock().pop_front()
    }

    /// Total connections accepted
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    /// Requests decoded for `command`
    pub fn request_count(&self, command: Command) -> usize {
        self.requests.lock().get(&command).copied().unwrap_or(0)
    }

    pub(crate) fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::AcqRel);
    }
}
