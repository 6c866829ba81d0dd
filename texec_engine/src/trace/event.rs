//! Trace event model
//!
//! One [`Event`] per trace record. Event and payload codes are shared by both
//! wire formats.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event codes on the wire
pub const EVENT_CODE_DUMP_SYSTEM_STATE: u32 = 1;
pub const EVENT_CODE_START_CAPTURING: u32 = 2;
pub const EVENT_CODE_STOP_CAPTURING: u32 = 3;
pub const EVENT_CODE_USER_MESSAGE: u32 = 4;
pub const EVENT_CODE_TASK_CREATE: u32 = 7;
pub const EVENT_CODE_TASK_DELETE: u32 = 11;
pub const EVENT_CODE_TASK_SWITCHED_IN: u32 = 26;

/// Payload tags of the compact format (`<info_id>:<info_value>`)
pub const INFO_CODE_NONE: u32 = 0;
pub const INFO_CODE_PRIORITY: u32 = 1;
pub const INFO_CODE_MESSAGE: u32 = 2;
pub const INFO_CODE_MARKER: u32 = 3;

/// Kind of a trace occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    DumpSystemState,
    StartCapturing,
    StopCapturing,
    UserMessage,
    TaskCreate,
    TaskDelete,
    TaskSwitchedIn,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::DumpSystemState,
        EventKind::StartCapturing,
        EventKind::StopCapturing,
        EventKind::UserMessage,
        EventKind::TaskCreate,
        EventKind::TaskDelete,
        EventKind::TaskSwitchedIn,
    ];

    /// Map a wire code to a kind, `None` for codes this engine does not track
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            EVENT_CODE_DUMP_SYSTEM_STATE => Some(EventKind::DumpSystemState),
            EVENT_CODE_START_CAPTURING => Some(EventKind::StartCapturing),
            EVENT_CODE_STOP_CAPTURING => Some(EventKind::StopCapturing),
            EVENT_CODE_USER_MESSAGE => Some(EventKind::UserMessage),
            EVENT_CODE_TASK_CREATE => Some(EventKind::TaskCreate),
            EVENT_CODE_TASK_DELETE => Some(EventKind::TaskDelete),
            EVENT_CODE_TASK_SWITCHED_IN => Some(EventKind::TaskSwitchedIn),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            EventKind::DumpSystemState => EVENT_CODE_DUMP_SYSTEM_STATE,
            EventKind::StartCapturing => EVENT_CODE_START_CAPTURING,
            EventKind::StopCapturing => EVENT_CODE_STOP_CAPTURING,
            EventKind::UserMessage => EVENT_CODE_USER_MESSAGE,
            EventKind::TaskCreate => EVENT_CODE_TASK_CREATE,
            EventKind::TaskDelete => EVENT_CODE_TASK_DELETE,
            EventKind::TaskSwitchedIn => EVENT_CODE_TASK_SWITCHED_IN,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::DumpSystemState => "DUMP_STATE",
            EventKind::StartCapturing => "START",
            EventKind::StopCapturing => "STOP",
            EventKind::UserMessage => "MESSAGE",
            EventKind::TaskCreate => "CREATE",
            EventKind::TaskDelete => "DELETE",
            EventKind::TaskSwitchedIn => "SWITCH_IN",
        };
        f.write_str(name)
    }
}

/// The single tagged auxiliary field a record may carry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Payload {
    #[default]
    None,
    Priority(u32),
    Text(String),
    Marker(u32),
}

impl Payload {
    pub fn info_code(&self) -> u32 {
        match self {
            Payload::None => INFO_CODE_NONE,
            Payload::Priority(_) => INFO_CODE_PRIORITY,
            Payload::Text(_) => INFO_CODE_MESSAGE,
            Payload::Marker(_) => INFO_CODE_MARKER,
        }
    }
}

/// One trace occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Microseconds since tracer start
    pub timestamp: u64,
    pub kind: EventKind,
    pub task_id: u32,
    /// Set by the timeline once the next switch-in is seen; never parsed
    pub duration: Option<u64>,
    pub payload: Payload,
}

impl Event {
    pub fn new(timestamp: u64, kind: EventKind, task_id: u32) -> Self {
        Self {
            timestamp,
            kind,
            task_id,
            duration: None,
            payload: Payload::None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_priority(self, priority: u32) -> Self {
        self.with_payload(Payload::Priority(priority))
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_payload(Payload::Text(text.into()))
    }

    pub fn with_marker(self, marker: u32) -> Self {
        self.with_payload(Payload::Marker(marker))
    }

    pub fn priority(&self) -> Option<u32> {
        match self.payload {
            Payload::Priority(prio) => Some(prio),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn marker(&self) -> Option<u32> {
        match self.payload {
            Payload::Marker(mark) => Some(mark),
            _ => None,
        }
    }

    /// End of the execution interval, once finalized
    pub fn end(&self) -> Option<u64> {
        self.duration.map(|d| self.timestamp.saturating_add(d))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} task={}", self.timestamp, self.kind, self.task_id)?;
        match &self.payload {
            Payload::None => {}
            Payload::Priority(prio) => write!(f, " prio={prio}")?,
            Payload::Text(text) => write!(f, " text={text:?}")?,
            Payload::Marker(mark) => write!(f, " mark={mark}")?,
        }
        if let Some(duration) = self.duration {
            write!(f, " duration={duration}")?;
        }
        Ok(())
    }
}
