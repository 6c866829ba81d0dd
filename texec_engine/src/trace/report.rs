//! Session report builder
//!
//! Shapes a closed session into the tables a chart renderer draws: execution
//! intervals (Gantt bars), task lifetime markers, user messages and the two
//! capture boundaries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::event::EventKind;
use super::session::CaptureSession;

/// One finalized switch-in: `label` ran from `start` for `duration` microseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInterval {
    pub task_id: u32,
    pub label: String,
    pub start: u64,
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl ExecutionInterval {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifetimeKind {
    Created,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeMarker {
    pub task_id: u32,
    pub label: String,
    pub timestamp: u64,
    pub kind: LifetimeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMarker {
    pub task_id: u32,
    pub timestamp: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryMarker {
    pub timestamp: u64,
    pub label: String,
}

/// Everything a renderer needs for one capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    pub name: String,
    /// Wall clock time (ms since the unix epoch) the session was opened
    pub opened_at_ms: u64,
    pub start: BoundaryMarker,
    pub stop: BoundaryMarker,
    pub intervals: Vec<ExecutionInterval>,
    pub lifetimes: Vec<LifetimeMarker>,
    pub messages: Vec<MessageMarker>,
}

/// Per-task aggregate over a report's intervals
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUsage {
    pub task_id: u32,
    pub label: String,
    pub busy: u64,
    pub switches: usize,
    /// `busy` relative to the session span, 0.0 for an empty span
    pub share: f64,
}

/// Build the report of a closed session
///
/// `stopped_at` is the trace timestamp of the stop-capturing event. An empty
/// session yields a report with empty tables.
pub fn build(session: CaptureSession, stopped_at: u64) -> ReportData {
    let name = session.name().to_string();
    let opened_at_ms = session.opened_at_ms();
    let start = BoundaryMarker {
        timestamp: session.started_at(),
        label: format!("start capturing {name}").trim().to_string(),
    };
    let stop = BoundaryMarker {
        timestamp: stopped_at,
        label: "stop capturing".to_string(),
    };

    let mut intervals = Vec::new();
    let mut lifetimes = Vec::new();
    let mut messages = Vec::new();

    for buffered in session.into_buffered() {
        let event = buffered.event;
        match event.kind {
            EventKind::TaskSwitchedIn => {
                // Only finalized switch-ins are ever buffered
                if let Some(duration) = event.duration {
                    intervals.push(ExecutionInterval {
                        task_id: event.task_id,
                        label: buffered.label,
                        start: event.timestamp,
                        duration,
                        priority: event.priority(),
                    });
                }
            }
            EventKind::TaskCreate | EventKind::TaskDelete => {
                let kind = if event.kind == EventKind::TaskCreate {
                    LifetimeKind::Created
                } else {
                    LifetimeKind::Deleted
                };
                lifetimes.push(LifetimeMarker {
                    task_id: event.task_id,
                    label: buffered.label,
                    timestamp: event.timestamp,
                    kind,
                });
            }
            EventKind::UserMessage => messages.push(MessageMarker {
                task_id: event.task_id,
                timestamp: event.timestamp,
                text: event.text().unwrap_or_default().to_string(),
            }),
            EventKind::DumpSystemState | EventKind::StartCapturing | EventKind::StopCapturing => {}
        }
    }

    ReportData {
        name,
        opened_at_ms,
        start,
        stop,
        intervals,
        lifetimes,
        messages,
    }
}

impl ReportData {
    /// Time between the capture boundaries
    pub fn span(&self) -> u64 {
        self.stop.timestamp.saturating_sub(self.start.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty() && self.lifetimes.is_empty() && self.messages.is_empty()
    }

    /// Busy time per task, busiest first
    pub fn task_usage(&self) -> Vec<TaskUsage> {
        let span = self.span();
        let mut usage: Vec<TaskUsage> = Vec::new();
        let mut index: HashMap<u32, usize> = HashMap::new();

        for interval in &self.intervals {
            let slot = *index.entry(interval.task_id).or_insert_with(|| {
                usage.push(TaskUsage {
                    task_id: interval.task_id,
                    label: interval.label.clone(),
                    busy: 0,
                    switches: 0,
                    share: 0.0,
                });
                usage.len() - 1
            });
            let entry = &mut usage[slot];
            entry.busy = entry.busy.saturating_add(interval.duration);
            entry.switches += 1;
            entry.label.clone_from(&interval.label);
        }

        for entry in &mut usage {
            if span > 0 {
                entry.share = entry.busy as f64 / span as f64;
            }
        }

        usage.sort_by(|a, b| b.busy.cmp(&a.busy).then(a.task_id.cmp(&b.task_id)));
        usage
    }
}
