// JSONレポートの具象実装

use crate::core::{BatchSummary, FailedJob, ReportSink};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// レポートファイルのフォーマット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub strategy: String,
    pub concurrency: usize,
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub failures: Vec<FailedJob>,
}

impl BatchReport {
    pub fn from_summary(summary: &BatchSummary, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            strategy: summary.strategy.to_string(),
            concurrency: summary.concurrency,
            total_jobs: summary.total_jobs,
            succeeded: summary.succeeded,
            failed: summary.failed,
            elapsed_ms: summary.elapsed.as_millis() as u64,
            failures: summary.failures.clone(),
        }
    }
}

/// サマリーを JSON ファイルに書き出すレポート実装
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    file_path: PathBuf,
}

impl JsonReportWriter {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl ReportSink for JsonReportWriter {
    fn write_summary(&self, summary: &BatchSummary) -> Result<()> {
        // 親ディレクトリが存在しない場合は作成
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("ディレクトリ作成エラー: {}", parent.display()))?;
            }
        }

        let report = BatchReport::from_summary(summary, Utc::now());
        let file = File::create(&self.file_path)
            .with_context(|| format!("ファイル作成エラー: {}", self.file_path.display()))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, &report).context("JSON変換エラー")?;
        writer.write_all(b"\n").context("書き込みエラー")?;
        writer.flush().context("書き込みエラー")?;
        Ok(())
    }
}
