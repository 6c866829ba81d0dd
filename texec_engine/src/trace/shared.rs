//! Thread-safe timeline handle
//!
//! For a reader thread feeding a processing thread. Each call holds the lock
//! for the whole transition so capture state and pending switch-in never
//! change independently.

use std::sync::Arc;

use parking_lot::Mutex;

use super::event::Event;
use super::timeline::{StreamEnd, Timeline, TimelineConfig, TimelineStats, Transition};

#[derive(Debug, Clone)]
pub struct SharedTimeline {
    inner: Arc<Mutex<Timeline>>,
}

impl SharedTimeline {
    pub fn new(config: TimelineConfig) -> Self {
        Self::from_timeline(Timeline::new(config))
    }

    pub fn from_timeline(timeline: Timeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(timeline)),
        }
    }

    pub fn process(&self, event: Event) -> Transition {
        self.inner.lock().process(event)
    }

    pub fn finish(&self) -> StreamEnd {
        self.inner.lock().finish()
    }

    pub fn stats(&self) -> TimelineStats {
        self.inner.lock().stats()
    }

    pub fn is_capturing(&self) -> bool {
        self.inner.lock().is_capturing()
    }

    /// Run `f` against the timeline under a single lock
    pub fn with_timeline<R>(&self, f: impl FnOnce(&Timeline) -> R) -> R {
        f(&self.inner.lock())
    }
}
