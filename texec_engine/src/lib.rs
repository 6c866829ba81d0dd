//! texec engine
//!
//! Turns a stream of RTOS scheduler trace lines into per-session task
//! execution reports. Lines come in one of two encodings (a json object or a
//! bracketed compact record); see [`trace::parser`].
//!
//! ```
//! use texec_engine::{parse, Timeline, Transition};
//!
//! let mut timeline = Timeline::default();
//! let lines = [
//!     r#"{"ts":0,"event":2,"ctx":{"task":0,"info":{"msg":"demo"}}}"#,
//!     "[1000|26|1|1:5]",
//!     "[1500|26|2|1:5]",
//!     "[2000|3|0|0:]",
//! ];
//!
//! let mut reports = Vec::new();
//! for line in lines {
//!     if let Transition::SessionClosed(report) = timeline.process(parse(line).unwrap()) {
//!         reports.push(report);
//!     }
//! }
//! assert_eq!(reports[0].intervals[0].duration, 500);
//! ```

pub mod trace;

pub use trace::*;
