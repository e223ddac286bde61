//! Main entry point for the runwa CLI application.
//!
//! Sets up the dated log file, then extracts the input archive. Any fatal
//! error is logged before the process exits with a failure status.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use runwa::{Cli, LogSink, NwaDecoder, extract_archive, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match &cli.log_dir {
        Some(dir) => dir.clone(),
        None => logging::default_log_dir().context("fail to create log path")?,
    };
    logging::init(&log_dir).context("fail to create log file")?;

    run(&cli).await.inspect_err(|e| error!("{e:#}"))
}

async fn run(cli: &Cli) -> Result<()> {
    cli.check_required()?;
    info!(
        "extracting {} into {}",
        cli.input_file.display(),
        cli.output_path
    );

    let report = extract_archive(
        &cli.input_file,
        &cli.output_path,
        Arc::new(NwaDecoder),
        Arc::new(LogSink::new(!cli.quiet)),
        cli.extract_options(),
    )
    .await?;

    info!(
        "{} file(s) written, {} bytes, {} failure(s)",
        report.extracted.len(),
        report.bytes_written(),
        report.failures.len()
    );

    if !report.is_success() {
        for failure in &report.failures {
            eprintln!("  failed: table[{}]: {}", failure.index, failure.error);
        }
        bail!(
            "{} of {} entries failed",
            report.failures.len(),
            report.failures.len() + report.extracted.len()
        );
    }

    Ok(())
}
