use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use texec_engine::{JsonFileSink, SharedTimeline, TimelineConfig, TimelineStats, TraceFormat};

use crate::{
    ingest::{log_stream_end, IngestSummary, Pipeline},
    output::PrintFormat,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "texec",
    author,
    version,
    about = "Turn RTOS scheduler traces into per-session task execution reports",
    long_about = None
)]
pub struct Args {
    /// Trace file to read (standard input when omitted)
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Record encoding: auto, json or compact
    #[arg(long, default_value = "auto")]
    pub format: TraceFormat,

    /// Directory receiving one json report per capture session
    #[arg(long, value_name = "PATH", env = "TEXEC_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Do not write report files
    #[arg(long)]
    pub no_write: bool,

    /// Report output on stdout: text, json or none
    #[arg(long, default_value = "text")]
    pub print: PrintFormat,

    /// Close the still-running switch-in at the stop timestamp
    #[arg(long)]
    pub close_at_stop: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: Option<PathBuf>,
    pub format: TraceFormat,
    /// `None` when report files are disabled
    pub out_dir: Option<PathBuf>,
    pub print: PrintFormat,
    pub timeline: TimelineConfig,
}

impl From<Args> for AppConfig {
    fn from(value: Args) -> Self {
        Self {
            input: value.input,
            format: value.format,
            out_dir: (!value.no_write).then_some(value.out_dir),
            print: value.print,
            timeline: TimelineConfig {
                close_pending_at_stop: value.close_at_stop,
            },
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run(config: AppConfig) -> Result<()> {
    let timeline = SharedTimeline::new(config.timeline);
    install_interrupt_handler(timeline.clone())?;

    let input = config
        .input
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());
    info!(
        input = %input,
        format = ?config.format,
        out_dir = ?config.out_dir,
        close_at_stop = config.timeline.close_pending_at_stop,
        "Reading scheduler trace",
    );

    let file_sink = config.out_dir.as_ref().map(|dir| JsonFileSink::new(dir));
    let stdout = io::stdout();
    let mut pipeline = Pipeline::new(timeline, config.format, file_sink, config.print, stdout.lock());

    let summary = match &config.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open trace input {}", path.display()))?;
            pipeline.run(BufReader::new(file))?
        }
        None => pipeline.run(io::stdin().lock())?,
    };

    log_summary(&summary);
    Ok(())
}

fn log_summary(summary: &IngestSummary) {
    info!(
        lines = summary.lines,
        skipped = summary.skipped,
        reports = summary.reports,
        "Trace processed",
    );
    log_stats(&summary.stats);
}

fn log_stats(stats: &TimelineStats) {
    info!(
        events = stats.events,
        intervals = stats.intervals_finalized,
        reports = stats.reports,
        sessions_discarded = stats.sessions_discarded,
        anomalies = stats.anomalies,
        "Timeline statistics",
    );
}

/// SIGINT ends the run with status 0 after reporting what was in flight
fn install_interrupt_handler(timeline: SharedTimeline) -> Result<()> {
    ctrlc::set_handler(move || {
        info!("Interrupted");
        log_stream_end(&timeline.finish());
        log_stats(&timeline.stats());
        std::process::exit(0);
    })
    .context("failed to install the SIGINT handler")
}
