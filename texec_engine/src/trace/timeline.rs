//! Timeline reconstructor
//!
//! Consumes parsed events one at a time and turns point-in-time switch-ins
//! into execution intervals, grouped by capture session.
//!
//! Two pieces of state are kept:
//! - capture state: idle, or capturing into one open [`CaptureSession`]
//! - pending switch-in: the latest switch-in whose successor has not been seen
//!
//! A switch-in is finalized when the next one arrives, whatever the capture
//! state, so interval continuity survives session boundaries. It joins a
//! session only if that same session was open when the switch-in was observed.
//!
//! Nothing here fails. Events that do not fit the current state are dropped
//! and reported back through [`Transition::Ignored`].

use super::event::{Event, EventKind};
use super::registry::TaskNameRegistry;
use super::report::{self, ReportData};
use super::session::{current_time_ms, CaptureSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimelineConfig {
    /// On stop, close the still-running switch-in at the stop timestamp and
    /// include it in the report. Off by default: the interval is left out.
    pub close_pending_at_stop: bool,
}

/// A well-formed event that has no meaning in the current capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    StopWhileIdle,
    MessageWhileIdle,
}

/// A session dropped without producing a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedSession {
    pub name: String,
    pub buffered: usize,
}

/// Outcome of processing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// State updated; nothing for the caller to act on
    Recorded,
    SessionOpened { name: String },
    /// A start arrived while capturing: the open session was dropped
    SessionReplaced {
        discarded: DiscardedSession,
        name: String,
    },
    SessionClosed(ReportData),
    Ignored(Anomaly),
}

/// What was lost when the input ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamEnd {
    pub discarded_session: Option<DiscardedSession>,
    pub pending_dropped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimelineStats {
    pub events: u64,
    pub intervals_finalized: u64,
    pub reports: u64,
    pub sessions_discarded: u64,
    pub anomalies: u64,
}

#[derive(Debug)]
enum CaptureState {
    Idle,
    Capturing(CaptureSession),
}

#[derive(Debug, Clone)]
struct PendingSwitch {
    event: Event,
    /// Epoch of the session open when the switch-in was observed
    epoch: Option<u64>,
}

#[derive(Debug)]
pub struct Timeline {
    config: TimelineConfig,
    registry: TaskNameRegistry,
    capture: CaptureState,
    pending: Option<PendingSwitch>,
    next_epoch: u64,
    stats: TimelineStats,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}

impl Timeline {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            registry: TaskNameRegistry::new(),
            capture: CaptureState::Idle,
            pending: None,
            next_epoch: 1,
            stats: TimelineStats::default(),
        }
    }

    pub fn config(&self) -> TimelineConfig {
        self.config
    }

    pub fn registry(&self) -> &TaskNameRegistry {
        &self.registry
    }

    pub fn stats(&self) -> TimelineStats {
        self.stats
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.capture, CaptureState::Capturing(_))
    }

    pub fn current_session(&self) -> Option<&CaptureSession> {
        match &self.capture {
            CaptureState::Capturing(session) => Some(session),
            CaptureState::Idle => None,
        }
    }

    /// The switch-in still waiting for its successor
    pub fn pending(&self) -> Option<&Event> {
        self.pending.as_ref().map(|p| &p.event)
    }

    /// Process one event to completion
    pub fn process(&mut self, event: Event) -> Transition {
        self.stats.events += 1;

        match event.kind {
            EventKind::DumpSystemState => {
                if let Some(name) = event.text() {
                    self.registry.bind(event.task_id, name);
                }
                Transition::Recorded
            }
            EventKind::TaskCreate => {
                if let Some(name) = event.text() {
                    self.registry.bind(event.task_id, name);
                }
                let label = self.registry.label(event.task_id);
                if let CaptureState::Capturing(session) = &mut self.capture {
                    session.push(event, label);
                }
                Transition::Recorded
            }
            EventKind::TaskDelete => {
                if let CaptureState::Capturing(session) = &mut self.capture {
                    let label = event
                        .text()
                        .map(str::to_string)
                        .unwrap_or_else(|| self.registry.label(event.task_id));
                    session.push(event, label);
                }
                Transition::Recorded
            }
            EventKind::TaskSwitchedIn => {
                self.switch_in(event);
                Transition::Recorded
            }
            EventKind::StartCapturing => self.start_capturing(event),
            EventKind::StopCapturing => self.stop_capturing(event),
            EventKind::UserMessage => {
                let label = self.registry.label(event.task_id);
                if let CaptureState::Capturing(session) = &mut self.capture {
                    session.push(event, label);
                    Transition::Recorded
                } else {
                    self.ignore(Anomaly::MessageWhileIdle)
                }
            }
        }
    }

    /// Close the stream: an open session and the pending switch-in are dropped
    pub fn finish(&mut self) -> StreamEnd {
        let discarded_session = match std::mem::replace(&mut self.capture, CaptureState::Idle) {
            CaptureState::Capturing(session) => {
                self.stats.sessions_discarded += 1;
                Some(DiscardedSession {
                    name: session.name().to_string(),
                    buffered: session.len(),
                })
            }
            CaptureState::Idle => None,
        };

        StreamEnd {
            discarded_session,
            pending_dropped: self.pending.take().is_some(),
        }
    }

    fn current_epoch(&self) -> Option<u64> {
        self.current_session().map(CaptureSession::epoch)
    }

    fn switch_in(&mut self, event: Event) {
        let epoch = self.current_epoch();

        if let Some(PendingSwitch {
            event: mut finished,
            epoch: observed_in,
        }) = self.pending.take()
        {
            // Out-of-order timestamps collapse to an empty interval
            finished.duration = Some(event.timestamp.saturating_sub(finished.timestamp));
            self.stats.intervals_finalized += 1;

            let label = self.registry.label(finished.task_id);
            if let CaptureState::Capturing(session) = &mut self.capture {
                if observed_in == Some(session.epoch()) {
                    session.push(finished, label);
                }
            }
        }

        self.pending = Some(PendingSwitch { event, epoch });
    }

    fn start_capturing(&mut self, event: Event) -> Transition {
        let name = event.text().unwrap_or_default().to_string();
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let session = CaptureSession::new(name.clone(), epoch, event.timestamp, current_time_ms());
        match std::mem::replace(&mut self.capture, CaptureState::Capturing(session)) {
            CaptureState::Capturing(previous) => {
                self.stats.sessions_discarded += 1;
                Transition::SessionReplaced {
                    discarded: DiscardedSession {
                        name: previous.name().to_string(),
                        buffered: previous.len(),
                    },
                    name,
                }
            }
            CaptureState::Idle => Transition::SessionOpened { name },
        }
    }

    fn stop_capturing(&mut self, event: Event) -> Transition {
        let mut session = match std::mem::replace(&mut self.capture, CaptureState::Idle) {
            CaptureState::Capturing(session) => session,
            CaptureState::Idle => return self.ignore(Anomaly::StopWhileIdle),
        };

        if self.config.close_pending_at_stop {
            if let Some(pending) = &self.pending {
                if pending.epoch == Some(session.epoch()) {
                    let mut clipped = pending.event.clone();
                    clipped.duration = Some(event.timestamp.saturating_sub(clipped.timestamp));
                    session.push(clipped, self.registry.label(pending.event.task_id));
                }
            }
        }

        self.stats.reports += 1;
        Transition::SessionClosed(report::build(session, event.timestamp))
    }

    fn ignore(&mut self, anomaly: Anomaly) -> Transition {
        self.stats.anomalies += 1;
        Transition::Ignored(anomaly)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    fn start(ts: u64, name: &str) -> Event {
        Event::new(ts, EventKind::StartCapturing, 0).with_text(name)
    }

    fn stop(ts: u64) -> Event {
        Event::new(ts, EventKind::StopCapturing, 0)
    }

    fn switch_in(ts: u64, task: u32) -> Event {
        Event::new(ts, EventKind::TaskSwitchedIn, task).with_priority(1)
    }

    fn closed(transition: Transition) -> ReportData {
        match transition {
            Transition::SessionClosed(report) => report,
            other => panic!("expected a closed session, got {other:?}"),
        }
    }

    #[test]
    fn test_timeline__start_while_idle__then_session_opened() {
        let mut timeline = Timeline::default();
        let transition = timeline.process(start(10, "demo"));

        assert_eq!(transition, Transition::SessionOpened { name: "demo".to_string() });
        assert!(timeline.is_capturing());
        assert_eq!(timeline.current_session().unwrap().started_at(), 10);
    }

    #[test]
    fn test_timeline__start_without_text__then_unnamed_session() {
        let mut timeline = Timeline::default();
        let transition = timeline.process(Event::new(10, EventKind::StartCapturing, 0));
        assert_eq!(transition, Transition::SessionOpened { name: String::new() });
    }

    #[test]
    fn test_timeline__stop_while_idle__then_ignored_and_unchanged() {
        let mut timeline = Timeline::default();
        timeline.process(switch_in(5, 1));

        let transition = timeline.process(stop(10));

        assert_eq!(transition, Transition::Ignored(Anomaly::StopWhileIdle));
        assert!(!timeline.is_capturing());
        assert_eq!(timeline.pending().map(|e| e.timestamp), Some(5));
        assert_eq!(timeline.stats().anomalies, 1);
        assert_eq!(timeline.stats().reports, 0);
    }

    #[test]
    fn test_timeline__message_while_idle__then_dropped() {
        let mut timeline = Timeline::default();
        let transition =
            timeline.process(Event::new(1, EventKind::UserMessage, 1).with_text("lost"));
        assert_eq!(transition, Transition::Ignored(Anomaly::MessageWhileIdle));
    }

    #[test]
    fn test_timeline__switch_ins__then_finalized_by_successor() {
        let mut timeline = Timeline::default();
        timeline.process(start(0, "s"));
        timeline.process(switch_in(100, 1));
        assert!(timeline.current_session().unwrap().is_empty());

        timeline.process(switch_in(250, 2));
        let session = timeline.current_session().unwrap();
        assert_eq!(session.len(), 1);
        assert_eq!(session.buffered()[0].event.duration, Some(150));
        assert_eq!(timeline.pending().map(|e| e.duration), Some(None));
        assert_eq!(timeline.stats().intervals_finalized, 1);
    }

    #[test]
    fn test_timeline__dump_system_state__then_name_bound_not_buffered() {
        let mut timeline = Timeline::default();
        timeline.process(start(0, "s"));
        timeline.process(Event::new(1, EventKind::DumpSystemState, 4).with_text("IDLE"));

        assert_eq!(timeline.registry().resolve(4), Some("IDLE"));
        assert!(timeline.current_session().unwrap().is_empty());
    }

    #[test]
    fn test_timeline__task_create_while_idle__then_bound_only() {
        let mut timeline = Timeline::default();
        timeline.process(Event::new(1, EventKind::TaskCreate, 2).with_text("Net"));
        assert_eq!(timeline.registry().resolve(2), Some("Net"));
        assert!(timeline.current_session().is_none());
    }

    #[test]
    fn test_timeline__task_delete_without_name__then_registry_label() {
        let mut timeline = Timeline::default();
        timeline.process(Event::new(1, EventKind::DumpSystemState, 2).with_text("Net"));
        timeline.process(start(2, "s"));
        timeline.process(Event::new(3, EventKind::TaskDelete, 2));
        timeline.process(Event::new(4, EventKind::TaskDelete, 9));

        let report = closed(timeline.process(stop(5)));
        let labels: Vec<&str> = report.lifetimes.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["Net", "Task #9"]);
    }

    #[test]
    fn test_timeline__switch_in_before_start__then_not_in_report() {
        let mut timeline = Timeline::default();
        timeline.process(switch_in(0, 1));
        timeline.process(start(10, "s"));
        timeline.process(switch_in(20, 2));
        timeline.process(switch_in(30, 3));

        let report = closed(timeline.process(stop(40)));
        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.intervals[0].task_id, 2);
        assert_eq!(report.intervals[0].duration, 10);
    }

    #[test]
    fn test_timeline__pending_at_stop__then_excluded_by_default() {
        let mut timeline = Timeline::default();
        timeline.process(start(0, "s"));
        timeline.process(switch_in(10, 1));

        let report = closed(timeline.process(stop(50)));
        assert!(report.intervals.is_empty());
        assert!(timeline.pending().is_some());
    }

    #[test]
    fn test_timeline__pending_at_stop_with_close_option__then_clipped_interval() {
        let mut timeline = Timeline::new(TimelineConfig {
            close_pending_at_stop: true,
        });
        timeline.process(Event::new(0, EventKind::TaskCreate, 1).with_text("A"));
        timeline.process(start(5, "s"));
        timeline.process(switch_in(10, 1));

        let report = closed(timeline.process(stop(50)));
        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.intervals[0].label, "A");
        assert_eq!(report.intervals[0].duration, 40);

        // The pending switch-in is still finalized by its real successor
        assert_eq!(timeline.pending().map(|e| e.timestamp), Some(10));
        timeline.process(switch_in(70, 2));
        assert_eq!(timeline.stats().intervals_finalized, 1);
    }

    #[test]
    fn test_timeline__close_option_with_pending_from_before_start__then_not_clipped() {
        let mut timeline = Timeline::new(TimelineConfig {
            close_pending_at_stop: true,
        });
        timeline.process(switch_in(0, 1));
        timeline.process(start(5, "s"));

        let report = closed(timeline.process(stop(50)));
        assert!(report.intervals.is_empty());
    }

    #[test]
    fn test_timeline__restart_while_capturing__then_previous_discarded() {
        let mut timeline = Timeline::default();
        timeline.process(start(0, "first"));
        timeline.process(Event::new(1, EventKind::UserMessage, 1).with_text("old"));

        let transition = timeline.process(start(2, "second"));
        assert_eq!(
            transition,
            Transition::SessionReplaced {
                discarded: DiscardedSession {
                    name: "first".to_string(),
                    buffered: 1,
                },
                name: "second".to_string(),
            }
        );
        assert_eq!(timeline.stats().sessions_discarded, 1);

        timeline.process(Event::new(3, EventKind::UserMessage, 1).with_text("new"));
        let report = closed(timeline.process(stop(4)));
        assert_eq!(report.name, "second");
        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.messages[0].text, "new");
    }

    #[test]
    fn test_timeline__finish_with_open_session__then_discarded() {
        let mut timeline = Timeline::default();
        timeline.process(start(0, "s"));
        timeline.process(switch_in(1, 1));
        timeline.process(switch_in(2, 2));

        let end = timeline.finish();
        assert_eq!(
            end,
            StreamEnd {
                discarded_session: Some(DiscardedSession {
                    name: "s".to_string(),
                    buffered: 1,
                }),
                pending_dropped: true,
            }
        );
        assert!(!timeline.is_capturing());
        assert!(timeline.pending().is_none());
    }

    #[test]
    fn test_timeline__finish_when_idle__then_nothing_lost() {
        let mut timeline = Timeline::default();
        assert_eq!(timeline.finish(), StreamEnd::default());
    }

    #[test]
    fn test_timeline__decreasing_timestamps__then_zero_duration() {
        let mut timeline = Timeline::default();
        timeline.process(start(0, "s"));
        timeline.process(switch_in(100, 1));
        timeline.process(switch_in(90, 2));
        timeline.process(switch_in(120, 1));

        let report = closed(timeline.process(stop(130)));
        assert_eq!(report.intervals[0].duration, 0);
        assert_eq!(report.intervals[1].duration, 30);
    }

    #[test]
    fn test_timeline__stats__then_counts_events_and_reports() {
        let mut timeline = Timeline::default();
        timeline.process(start(0, "s"));
        timeline.process(switch_in(1, 1));
        timeline.process(switch_in(2, 1));
        timeline.process(stop(3));

        let stats = timeline.stats();
        assert_eq!(stats.events, 4);
        assert_eq!(stats.reports, 1);
        assert_eq!(stats.intervals_finalized, 1);
    }
}
