//! Line ingestion
//!
//! Reads trace records line by line, feeds them through the shared timeline
//! and hands every closed session to the file sink and the stdout printer.
//! All drop points the engine reports are logged here.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use texec_engine::{
    parse_with, JsonFileSink, ReportData, ReportSink, SharedTimeline, StreamEnd, TimelineStats,
    TraceFormat, Transition,
};

use crate::output::{format_report, PrintFormat};

/// What one pass over the input produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Non-blank lines read
    pub lines: u64,
    /// Lines that did not parse
    pub skipped: u64,
    pub reports: u64,
    pub end: StreamEnd,
    pub stats: TimelineStats,
}

pub struct Pipeline<W: Write> {
    timeline: SharedTimeline,
    format: TraceFormat,
    file_sink: Option<JsonFileSink>,
    print: PrintFormat,
    out: W,
}

impl<W: Write> Pipeline<W> {
    pub fn new(
        timeline: SharedTimeline,
        format: TraceFormat,
        file_sink: Option<JsonFileSink>,
        print: PrintFormat,
        out: W,
    ) -> Self {
        Self {
            timeline,
            format,
            file_sink,
            print,
            out,
        }
    }

    /// Consume `reader` to the end, then close the stream
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();

        // Split on raw bytes so a corrupt line is skipped instead of ending the read
        for (index, line) in reader.split(b'\n').enumerate() {
            let line_no = index + 1;
            let bytes = line.with_context(|| format!("failed to read input line {line_no}"))?;
            let raw = String::from_utf8_lossy(&bytes);
            if raw.trim().is_empty() {
                continue;
            }
            summary.lines += 1;

            let event = match parse_with(&raw, self.format) {
                Ok(event) => event,
                Err(err) => {
                    summary.skipped += 1;
                    debug!(line = line_no, error = %err, "Skipping record");
                    continue;
                }
            };

            match self.timeline.process(event) {
                Transition::Recorded => {}
                Transition::SessionOpened { name } => {
                    info!(line = line_no, session = %name, "Capture session opened");
                }
                Transition::SessionReplaced { discarded, name } => {
                    warn!(
                        line = line_no,
                        discarded = %discarded.name,
                        buffered = discarded.buffered,
                        session = %name,
                        "Capture restarted, previous session discarded",
                    );
                }
                Transition::SessionClosed(report) => {
                    info!(
                        line = line_no,
                        session = %report.name,
                        intervals = report.intervals.len(),
                        span = report.span(),
                        "Capture session closed",
                    );
                    self.emit(&report)?;
                    summary.reports += 1;
                }
                Transition::Ignored(anomaly) => {
                    debug!(line = line_no, ?anomaly, "Event ignored");
                }
            }
        }

        summary.end = self.timeline.finish();
        log_stream_end(&summary.end);
        summary.stats = self.timeline.stats();
        Ok(summary)
    }

    fn emit(&mut self, report: &ReportData) -> Result<()> {
        if let Some(sink) = self.file_sink.as_mut() {
            sink.deliver(report)
                .with_context(|| format!("failed to write report for session '{}'", report.name))?;
            if let Some(path) = sink.written().last() {
                info!(session = %report.name, path = %path.display(), "Report written");
            }
        }

        if let Some(text) = format_report(report, self.print) {
            writeln!(self.out, "{text}").context("failed to print report")?;
            self.out.flush().context("failed to flush stdout")?;
        }

        Ok(())
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }
}

pub fn log_stream_end(end: &StreamEnd) {
    if let Some(session) = &end.discarded_session {
        warn!(
            session = %session.name,
            buffered = session.buffered,
            "Input ended inside a capture session, session discarded",
        );
    }
    if end.pending_dropped {
        debug!("Input ended with a switch-in still running, interval dropped");
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use texec_engine::TimelineConfig;

    const DEMO: &str = "\
[0|2|0|2:demo]
[10|7|1|2:Worker]

[1000|26|1|1:3]
not a record
[1500|26|2|1:1]
[1600|3|0|0:]
";

    fn pipeline(
        file_sink: Option<JsonFileSink>,
        print: PrintFormat,
        config: TimelineConfig,
    ) -> Pipeline<Vec<u8>> {
        Pipeline::new(
            SharedTimeline::new(config),
            TraceFormat::Auto,
            file_sink,
            print,
            Vec::new(),
        )
    }

    #[test]
    fn test_pipeline__demo_trace__then_report_written_and_counted() {
        let temp = TempDir::new().unwrap();
        let mut pipeline = pipeline(
            Some(JsonFileSink::new(temp.path())),
            PrintFormat::None,
            TimelineConfig::default(),
        );

        let summary = pipeline.run(DEMO.as_bytes()).unwrap();

        assert_eq!(summary.lines, 6);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.reports, 1);
        assert!(summary.end.pending_dropped);
        assert_eq!(summary.end.discarded_session, None);
        assert_eq!(summary.stats.events, 5);

        let files: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("texec__demo__"));
        assert!(name.ends_with(".json"));

        let report: ReportData = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.intervals[0].label, "Worker");
        assert_eq!(report.intervals[0].duration, 500);
        assert!(pipeline.into_output().is_empty());
    }

    #[test]
    fn test_pipeline__json_print__then_report_on_output() {
        let mut pipeline = pipeline(None, PrintFormat::Json, TimelineConfig::default());
        pipeline.run(DEMO.as_bytes()).unwrap();

        let out = String::from_utf8(pipeline.into_output()).unwrap();
        let report: ReportData = serde_json::from_str(&out).unwrap();
        assert_eq!(report.name, "demo");
    }

    #[test]
    fn test_pipeline__close_at_stop__then_trailing_interval_printed() {
        let mut pipeline = pipeline(
            None,
            PrintFormat::Json,
            TimelineConfig {
                close_pending_at_stop: true,
            },
        );
        pipeline.run(DEMO.as_bytes()).unwrap();

        let out = String::from_utf8(pipeline.into_output()).unwrap();
        let report: ReportData = serde_json::from_str(&out).unwrap();
        assert_eq!(report.intervals.len(), 2);
        assert_eq!(report.intervals[1].duration, 100);
    }

    #[test]
    fn test_pipeline__explicit_json_format__then_compact_lines_skipped() {
        let mut pipeline = Pipeline::new(
            SharedTimeline::new(TimelineConfig::default()),
            TraceFormat::Json,
            None,
            PrintFormat::Text,
            Vec::new(),
        );

        let summary = pipeline.run(DEMO.as_bytes()).unwrap();

        assert_eq!(summary.skipped, summary.lines);
        assert_eq!(summary.reports, 0);
        assert!(pipeline.into_output().is_empty());
    }

    #[test]
    fn test_pipeline__invalid_utf8__then_line_skipped() {
        let mut input = b"[0|2|0|2:s]\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"[5|3|0|0:]\n");

        let mut pipeline = pipeline(None, PrintFormat::Text, TimelineConfig::default());
        let summary = pipeline.run(input.as_slice()).unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.reports, 1);
        let out = String::from_utf8(pipeline.into_output()).unwrap();
        assert!(out.starts_with("Session: s\n"));
    }

    #[test]
    fn test_pipeline__input_ends_mid_session__then_discard_reported() {
        let mut pipeline = pipeline(None, PrintFormat::Text, TimelineConfig::default());
        let summary = pipeline
            .run("[0|2|0|2:open]\n[1|4|0|2:hello]\n".as_bytes())
            .unwrap();

        let discarded = summary.end.discarded_session.unwrap();
        assert_eq!(discarded.name, "open");
        assert_eq!(discarded.buffered, 1);
        assert_eq!(summary.reports, 0);
    }

    #[test]
    fn test_pipeline__unwritable_out_dir__then_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let mut pipeline = pipeline(
            Some(JsonFileSink::new(&blocker)),
            PrintFormat::None,
            TimelineConfig::default(),
        );
        let err = pipeline.run(DEMO.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("demo"));
    }
}
