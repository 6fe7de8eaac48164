// RunCoordinator - 1回のバッチ実行を管理する
// 設定検証、ジョブ列挙、戦略の選択、経過時間の計測、レポート出力を担当

use crate::{
    core::{BatchError, BatchResult, BatchSummary, ConversionUnit, ProgressReporter, ReportSink},
    dispatch::{dispatcher_for, CancelToken, DispatchContext},
    enumerator::JobEnumerator,
    services::{BatchConfig, JsonReportWriter},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// 1バッチ分の実行を管理するコーディネーター
///
/// 依存関係はコンストラクタで注入する。戦略は設定で1つだけ選ばれ、
/// 実行ごとにキュー・トークン・共有メモリを作り直す。
pub struct RunCoordinator<U, R> {
    unit: Arc<U>,
    reporter: Arc<R>,
    config: BatchConfig,
    report_sink: Option<Box<dyn ReportSink>>,
    cancel: CancelToken,
}

impl<U, R> RunCoordinator<U, R>
where
    U: ConversionUnit + 'static,
    R: ProgressReporter + 'static,
{
    pub fn new(unit: U, reporter: R, config: BatchConfig) -> Self {
        let report_sink = config
            .report_path()
            .map(|path| Box::new(JsonReportWriter::new(path)) as Box<dyn ReportSink>);

        Self {
            unit: Arc::new(unit),
            reporter: Arc::new(reporter),
            config,
            report_sink,
            cancel: CancelToken::new(),
        }
    }

    /// レポート出力先を差し替える
    pub fn with_report_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// 実行中のバッチを止めるためのハンドル
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// バッチを最後まで実行してサマリーを返す
    ///
    /// 設定エラーとディレクトリを開けない場合はディスパッチ前に失敗する。
    /// 個別ジョブの失敗はサマリーに集計され、`Err` にはならない。
    pub fn run(&self) -> BatchResult<BatchSummary> {
        self.config.validate()?;

        let strategy = self.config.strategy();
        let dispatcher = dispatcher_for::<U, R>(strategy)?;

        // 分配前にジョブを確定させる
        let jobs: Vec<_> =
            JobEnumerator::open(self.config.folder(), self.config.output_prefix())?.collect();
        let total = jobs.len();

        info!(
            strategy = %strategy,
            concurrency = self.config.concurrency(),
            total_jobs = total,
            folder = %self.config.folder().display(),
            "Starting batch"
        );
        self.reporter.report_started(strategy.name(), total);

        let ctx = Arc::new(DispatchContext::new(
            Arc::clone(&self.unit),
            Arc::clone(&self.reporter),
            self.config.concurrency(),
            total,
            self.cancel.clone(),
        ));

        let start = Instant::now();
        let outcomes = dispatcher.dispatch(jobs, &ctx)?;
        let elapsed = start.elapsed();

        if outcomes.len() != total {
            return Err(BatchError::resource(
                "dispatcher",
                format!("{} of {total} jobs were not accounted for", total.abs_diff(outcomes.len())),
            ));
        }

        let summary = BatchSummary::from_outcomes(
            strategy.name(),
            self.config.concurrency(),
            &outcomes,
            elapsed,
        );
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch finished"
        );
        self.reporter.report_completed(&summary);

        Ok(summary)
    }

    /// レポート出力先が設定されていればサマリーを書き出す
    pub fn write_report(&self, summary: &BatchSummary) -> BatchResult<()> {
        match &self.report_sink {
            Some(sink) => {
                sink.write_summary(summary).map_err(BatchError::report)?;
                debug!("Batch report written");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
