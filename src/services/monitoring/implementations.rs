// 進捗監視の具象実装

use crate::core::{BatchSummary, JobOutcome, ProgressReporter};
use tracing::info;

/// 何件ごとに進捗行を出力するか
const PROGRESS_INTERVAL: usize = 10;

/// コンソール出力による進捗報告実装
#[derive(Debug, Default, Clone)]
pub struct ConsoleProgressReporter {
    quiet: bool,
}

impl ConsoleProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_started(&self, strategy: &str, total_jobs: usize) {
        if !self.quiet {
            println!("🚀 Converting {total_jobs} images with {strategy}...");
        }
    }

    fn report_job_finished(&self, outcome: &JobOutcome, completed: usize, total: usize) {
        if self.quiet {
            return;
        }
        if let JobOutcome::Failure { job, kind, message } = outcome {
            eprintln!("❌ {} [{kind}]: {message}", job.source().display());
        }
        if completed % PROGRESS_INTERVAL == 0 || completed == total {
            let percentage = (completed as f64 / total.max(1) as f64) * 100.0;
            println!("📊 Progress: {completed}/{total} ({percentage:.1}%)");
        }
    }

    fn report_completed(&self, summary: &BatchSummary) {
        if !self.quiet {
            println!(
                "✅ Completed! Succeeded: {}, Failed: {}",
                summary.succeeded, summary.failed
            );
        }
    }
}

/// 進捗をログとして出力する実装（--quiet 時でもログには残したい場合）
#[derive(Debug, Default, Clone)]
pub struct TracingProgressReporter;

impl TracingProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for TracingProgressReporter {
    fn report_started(&self, strategy: &str, total_jobs: usize) {
        info!(strategy, total_jobs, "Batch started");
    }

    fn report_job_finished(&self, outcome: &JobOutcome, completed: usize, total: usize) {
        info!(
            path = %outcome.job().source().display(),
            success = outcome.is_success(),
            completed,
            total,
            "Job finished"
        );
    }

    fn report_completed(&self, summary: &BatchSummary) {
        info!(
            strategy = summary.strategy,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Batch completed"
        );
    }
}

/// 何もしない進捗報告実装（テスト・ベンチマーク用）
#[derive(Debug, Default, Clone)]
pub struct NoOpProgressReporter;

impl NoOpProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NoOpProgressReporter {
    fn report_started(&self, _strategy: &str, _total_jobs: usize) {
        // 何もしない
    }

    fn report_job_finished(&self, _outcome: &JobOutcome, _completed: usize, _total: usize) {
        // 何もしない
    }

    fn report_completed(&self, _summary: &BatchSummary) {
        // 何もしない
    }
}
