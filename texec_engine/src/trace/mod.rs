//! Scheduler trace processing
//!
//! Line parsing, task name bookkeeping, timeline reconstruction and report
//! hand-off for RTOS scheduler traces.

pub mod error;
pub mod event;
pub mod parser;
pub mod registry;
pub mod report;
pub mod session;
pub mod shared;
pub mod sink;
pub mod timeline;

// Re-export main types
pub use error::{ParseError, ParseResult, SinkError};
pub use event::{
    Event, EventKind, Payload, EVENT_CODE_DUMP_SYSTEM_STATE, EVENT_CODE_START_CAPTURING,
    EVENT_CODE_STOP_CAPTURING, EVENT_CODE_TASK_CREATE, EVENT_CODE_TASK_DELETE,
    EVENT_CODE_TASK_SWITCHED_IN, EVENT_CODE_USER_MESSAGE, INFO_CODE_MARKER, INFO_CODE_MESSAGE,
    INFO_CODE_NONE, INFO_CODE_PRIORITY,
};
pub use parser::{parse, parse_compact, parse_json, parse_with, TraceFormat};
pub use registry::{synthetic_label, TaskNameRegistry};
pub use report::{
    BoundaryMarker, ExecutionInterval, LifetimeKind, LifetimeMarker, MessageMarker, ReportData,
    TaskUsage,
};
pub use session::{BufferedEvent, CaptureSession};
pub use shared::SharedTimeline;
pub use sink::{report_file_name, CollectingSink, JsonFileSink, ReportSink};
pub use timeline::{
    Anomaly, DiscardedSession, StreamEnd, Timeline, TimelineConfig, TimelineStats, Transition,
};
