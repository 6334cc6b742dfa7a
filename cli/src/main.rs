mod args;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use hlsgrab_core::DownloadEngine;
use tracing::warn;

use crate::args::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init_logging(cli.log_file.as_deref()) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }

    if let Err(err) = run(&cli) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let engine = DownloadEngine::new(cli.download_config()).context("build download engine")?;
    let report = engine
        .run(&cli.url, &cli.output)
        .with_context(|| format!("download {}", cli.url))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} segments: {} downloaded, {} already present, {} failed, {} not dispatched",
            report.total, report.downloaded, report.skipped, report.failed, report.not_dispatched
        );
    }
    if !report.is_complete() {
        warn!(
            failed = report.failed,
            not_dispatched = report.not_dispatched,
            "run finished with missing segments, see log for details"
        );
    }
    Ok(())
}
