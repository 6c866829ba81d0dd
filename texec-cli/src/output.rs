//! Output formatters for session reports
//!
//! Supports text and JSON output formats. Reports go to stdout; logs never do.

use texec_engine::{ReportData, TaskUsage};

/// Per-report stdout format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintFormat {
    #[default]
    Text,
    Json,
    None,
}

impl std::str::FromStr for PrintFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(PrintFormat::Text),
            "json" => Ok(PrintFormat::Json),
            "none" | "off" => Ok(PrintFormat::None),
            _ => Err(format!(
                "Unknown format '{}'. Use 'text', 'json' or 'none'",
                s
            )),
        }
    }
}

/// Format one closed session, `None` when nothing should be printed
pub fn format_report(report: &ReportData, format: PrintFormat) -> Option<String> {
    match format {
        PrintFormat::Text => Some(format_report_text(report)),
        PrintFormat::Json => Some(format_report_json(report)),
        PrintFormat::None => None,
    }
}

fn format_report_text(report: &ReportData) -> String {
    let mut output = String::new();

    let name = if report.name.is_empty() {
        "(unnamed)"
    } else {
        report.name.as_str()
    };
    output.push_str(&format!("Session: {}\n", name));
    output.push_str(&format!(
        "Span:    {} .. {} ({})\n",
        report.start.timestamp,
        report.stop.timestamp,
        report.span()
    ));
    output.push_str(&format!(
        "Events:  {} intervals, {} lifetime markers, {} messages\n",
        report.intervals.len(),
        report.lifetimes.len(),
        report.messages.len()
    ));

    let usage = report.task_usage();
    if !usage.is_empty() {
        output.push_str("\nTask usage:\n");
        for task in &usage {
            output.push_str(&format_usage_row(task));
        }
    }

    if !report.intervals.is_empty() {
        output.push_str(&format!(
            "\n{:>12} {:>10} {:>6}  {}\n",
            "start", "duration", "prio", "task"
        ));
        for interval in &report.intervals {
            let prio = interval
                .priority
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "{:>12} {:>10} {:>6}  {}\n",
                interval.start, interval.duration, prio, interval.label
            ));
        }
    }

    if !report.messages.is_empty() {
        output.push_str("\nMessages:\n");
        for message in &report.messages {
            output.push_str(&format!(
                "{:>12}  task {}: {}\n",
                message.timestamp, message.task_id, message.text
            ));
        }
    }

    output
}

fn format_usage_row(task: &TaskUsage) -> String {
    format!(
        "  {:<24} #{:<6} busy {:>10}  switches {:>5}  {:>5.1}%\n",
        task.label,
        task.task_id,
        task.busy,
        task.switches,
        task.share * 100.0
    )
}

fn format_report_json(report: &ReportData) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}
