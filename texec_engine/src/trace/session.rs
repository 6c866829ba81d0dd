//! Capture session state
//!
//! A session is the window between a start-capturing and a stop-capturing
//! event. Everything buffered here ends up in exactly one report, or is
//! discarded with the session.

use std::time::{SystemTime, UNIX_EPOCH};

use super::event::Event;

/// An event accepted into a session, with the task label resolved when it was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedEvent {
    pub event: Event,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct CaptureSession {
    name: String,
    epoch: u64,
    started_at: u64,
    opened_at_ms: u64,
    buffered: Vec<BufferedEvent>,
}

impl CaptureSession {
    /// `started_at` is the trace timestamp of the start event, `opened_at_ms`
    /// the wall clock time the session was opened
    pub fn new(name: impl Into<String>, epoch: u64, started_at: u64, opened_at_ms: u64) -> Self {
        Self {
            name: name.into(),
            epoch,
            started_at,
            opened_at_ms,
            buffered: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sequence number of this session within the stream
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn opened_at_ms(&self) -> u64 {
        self.opened_at_ms
    }

    pub fn push(&mut self, event: Event, label: impl Into<String>) {
        self.buffered.push(BufferedEvent {
            event,
            label: label.into(),
        });
    }

    pub fn buffered(&self) -> &[BufferedEvent] {
        &self.buffered
    }

    pub fn into_buffered(self) -> Vec<BufferedEvent> {
        self.buffered
    }

    pub fn len(&self) -> usize {
        self.buffered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered.is_empty()
    }
}

pub(crate) fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
