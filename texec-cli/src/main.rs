//! texec Command Line Interface
//!
//! Reads an RTOS scheduler trace (a file or standard input), rebuilds task
//! execution intervals per capture session and emits one report per session.
//!
//! ```text
//! texec --input trace.log --out-dir reports
//! tracer-dump | texec --no-write --print json
//! ```

mod app;
mod ingest;
mod output;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    app::init_tracing();
    let args = app::Args::parse();
    app::run(args.into())
}
