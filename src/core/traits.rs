// バッチ変換システムのトレイト定義
// ディスパッチ層から見た外部協調者の抽象化インターフェース

use super::error::CodecError;
use super::types::{BatchSummary, JobOutcome};
use mockall::automock;
use std::path::Path;

/// 1枚の画像を変換する外部ユニットの抽象化トレイト
///
/// 各ディスパッチ戦略から並行に呼ばれるため `Send + Sync` を要求する。
#[automock]
pub trait ConversionUnit: Send + Sync {
    /// `source` を読み込み、変換して `destination` に書き出す
    fn convert(&self, source: &Path, destination: &Path) -> Result<(), CodecError>;
}

/// 進捗報告の抽象化トレイト
#[automock]
pub trait ProgressReporter: Send + Sync {
    /// バッチ開始時の報告
    fn report_started(&self, strategy: &str, total_jobs: usize);

    /// ジョブ完了時の報告（成功・失敗とも）
    fn report_job_finished(&self, outcome: &JobOutcome, completed: usize, total: usize);

    /// バッチ完了時の報告
    fn report_completed(&self, summary: &BatchSummary);
}

// ProgressReporter for Box<dyn ProgressReporter>
impl ProgressReporter for Box<dyn ProgressReporter> {
    fn report_started(&self, strategy: &str, total_jobs: usize) {
        self.as_ref().report_started(strategy, total_jobs)
    }

    fn report_job_finished(&self, outcome: &JobOutcome, completed: usize, total: usize) {
        self.as_ref().report_job_finished(outcome, completed, total)
    }

    fn report_completed(&self, summary: &BatchSummary) {
        self.as_ref().report_completed(summary)
    }
}

/// バッチレポートの出力先
#[automock]
pub trait ReportSink: Send + Sync {
    /// サマリーを書き出す
    fn write_summary(&self, summary: &BatchSummary) -> anyhow::Result<()>;
}
