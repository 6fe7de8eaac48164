use crate::cli::args::Cli;
use crate::codec::GrayscaleConverter;
use crate::core::{BatchSummary, ProgressReporter};
use crate::coordinator::RunCoordinator;
use crate::services::{BatchConfig, ConsoleProgressReporter, TracingProgressReporter};
use anyhow::Result;

/// Build the batch configuration from parsed arguments
pub fn batch_config(cli: &Cli) -> BatchConfig {
    let config = BatchConfig::new(&cli.folder)
        .with_concurrency(cli.concurrency)
        .with_strategy(cli.mode.into())
        .with_progress_reporting(!cli.quiet);

    match &cli.report {
        Some(path) => config.with_report_path(path),
        None => config,
    }
}

/// Pick the progress reporter matching the output flags
pub fn progress_reporter(cli: &Cli, config: &BatchConfig) -> Box<dyn ProgressReporter> {
    if cli.verbose {
        Box::new(TracingProgressReporter::new())
    } else if config.progress_enabled() {
        Box::new(ConsoleProgressReporter::new())
    } else {
        Box::new(ConsoleProgressReporter::quiet())
    }
}

/// Execute one batch and print its timing
pub fn execute_run(cli: &Cli) -> Result<BatchSummary> {
    let config = batch_config(cli);
    let reporter = progress_reporter(cli, &config);
    let coordinator = RunCoordinator::new(GrayscaleConverter::new(), reporter, config);

    let summary = coordinator.run()?;
    print_summary(&summary);

    coordinator.write_report(&summary)?;
    if let Some(path) = coordinator.config().report_path() {
        println!("📄 Report saved to {}", path.display());
    }

    Ok(summary)
}

fn print_summary(summary: &BatchSummary) {
    println!("Total time: {:.6} s", summary.elapsed.as_secs_f64());
    println!(
        "Jobs: {} succeeded, {} failed ({} total, {} x{})",
        summary.succeeded, summary.failed, summary.total_jobs, summary.strategy, summary.concurrency
    );
    for failure in &summary.failures {
        println!(
            "  - {} [{}]: {}",
            failure.source.display(),
            failure.kind,
            failure.message
        );
    }
}
