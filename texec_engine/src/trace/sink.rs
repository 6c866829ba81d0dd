//! Report sinks
//!
//! The hand-off point to whatever renders a report. Chart drawing lives
//! outside this crate; the sinks here keep reports (in memory or as json
//! files a renderer picks up).

use std::fs;
use std::path::{Path, PathBuf};

use super::error::SinkError;
use super::report::ReportData;

pub trait ReportSink {
    fn deliver(&mut self, report: &ReportData) -> Result<(), SinkError>;
}

/// Keeps every delivered report
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub reports: Vec<ReportData>,
}

impl ReportSink for CollectingSink {
    fn deliver(&mut self, report: &ReportData) -> Result<(), SinkError> {
        self.reports.push(report.clone());
        Ok(())
    }
}

/// Writes each report as pretty json into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonFileSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written: Vec::new(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Paths written so far, in delivery order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ReportSink for JsonFileSink {
    fn deliver(&mut self, report: &ReportData) -> Result<(), SinkError> {
        fs::create_dir_all(&self.out_dir).map_err(|err| SinkError::io(&self.out_dir, err))?;

        let mut path = self.out_dir.join(report_file_name(report));
        // Two sessions with the same name opened within one millisecond
        let mut suffix = 1;
        while path.exists() {
            path = self
                .out_dir
                .join(format!("{}__{}.json", report_file_stem(report), suffix));
            suffix += 1;
        }

        let json = serde_json::to_vec_pretty(report)?;
        fs::write(&path, json).map_err(|err| SinkError::io(&path, err))?;
        self.written.push(path);
        Ok(())
    }
}

/// `texec__<name>__<opened_at_ms>.json`
pub fn report_file_name(report: &ReportData) -> String {
    format!("{}.json", report_file_stem(report))
}

fn report_file_stem(report: &ReportData) -> String {
    format!(
        "texec__{}__{}",
        sanitize_name(&report.name),
        report.opened_at_ms
    )
}

fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "session".to_string();
    }

    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
