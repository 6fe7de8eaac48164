// ディスパッチ層 - 同時実行数を制限しながらジョブを変換ユニットへ配る
//
// 3つの戦略を同じ `Dispatcher` トレイトの背後に置き、コーディネーターは
// 実行時にどれか1つを選ぶ:
//
// - `GatedSpawner`  : ジョブごとにスレッドを作成。作成前に許可トークンを取得
// - `QueuePool`     : 固定数のワーカーがFIFOキューからジョブを取り出す
// - `ProcessPool`   : 固定数の子プロセスをfork。共有メモリ上のセマフォで枠を管理

pub mod admission;
pub mod gated;
pub mod pool;
#[cfg(target_os = "linux")]
pub mod process;
pub mod queue;
#[cfg(target_os = "linux")]
pub mod shm;

use crate::core::{BatchResult, ConversionUnit, FailureKind, Job, JobOutcome, ProgressReporter};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

pub use admission::{AdmissionToken, AdmissionTokens};
pub use gated::GatedSpawner;
pub use pool::{QueuePool, WorkerPool};
#[cfg(target_os = "linux")]
pub use process::ProcessPool;
pub use queue::{Dequeued, TaskQueue};

/// ディスパッチ戦略の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 許可トークンで制限されたジョブ単位スレッド
    GatedThreads,
    /// キューを共有する固定ワーカープール
    QueuePool,
    /// fork した固定数のプロセス
    ProcessPool,
}

impl Strategy {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GatedThreads => "gated-threads",
            Self::QueuePool => "queue-pool",
            Self::ProcessPool => "process-pool",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// バッチ中断用の共有フラグ
///
/// キャンセル後は新しいジョブを受け付けず、未開始のジョブは
/// `FailureKind::Cancelled` として報告される。実行中のジョブは最後まで走る。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 1バッチ分のディスパッチに共有される依存関係とカウンター
pub struct DispatchContext<U, R> {
    unit: Arc<U>,
    reporter: Arc<R>,
    concurrency: usize,
    total: usize,
    completed: AtomicUsize,
    cancel: CancelToken,
}

impl<U, R> DispatchContext<U, R>
where
    U: ConversionUnit,
    R: ProgressReporter,
{
    pub fn new(
        unit: Arc<U>,
        reporter: Arc<R>,
        concurrency: usize,
        total: usize,
        cancel: CancelToken,
    ) -> Self {
        Self {
            unit,
            reporter,
            concurrency: concurrency.max(1),
            total,
            completed: AtomicUsize::new(0),
            cancel,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 完了報告済みのジョブ数
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// 変換ユニットを呼び出し、結果をジョブ単位の `JobOutcome` にまとめる
    ///
    /// パニックはこのジョブの失敗として扱い、呼び出し元には伝播させない。
    pub fn execute(&self, job: &Job) -> JobOutcome {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.unit.convert(job.source(), job.destination())
        }));

        match result {
            Ok(Ok(())) => JobOutcome::Success {
                job: job.clone(),
                elapsed: start.elapsed(),
            },
            Ok(Err(error)) => JobOutcome::failure(
                job.clone(),
                FailureKind::Codec { kind: error.kind() },
                error.to_string(),
            ),
            Err(_) => JobOutcome::failure(
                job.clone(),
                FailureKind::Panicked,
                "conversion panicked",
            ),
        }
    }

    /// 結果を集計してレポーターに通知する
    ///
    /// レポーターのパニック（標準出力が閉じられた場合など）は記録だけして、
    /// ジョブの結果はそのまま返す。
    pub fn finish(&self, outcome: JobOutcome) -> JobOutcome {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;

        if let JobOutcome::Failure { job, kind, message } = &outcome {
            warn!(path = %job.source().display(), kind = %kind, error = %message, "Job failed");
        }

        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reporter
                .report_job_finished(&outcome, completed, self.total)
        }));
        if reported.is_err() {
            warn!(path = %outcome.job().source().display(), "Progress reporter panicked");
        }
        outcome
    }
}

/// ディスパッチ戦略の抽象化トレイト
///
/// 実装は全ジョブの結果（成功・失敗・キャンセル）を1件ずつ返し、
/// 起動したスレッド・プロセスをすべて join / 回収してから戻る。
pub trait Dispatcher<U, R>: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn dispatch(
        &self,
        jobs: Vec<Job>,
        ctx: &Arc<DispatchContext<U, R>>,
    ) -> BatchResult<Vec<JobOutcome>>;
}

/// 戦略に対応するディスパッチャーを作成
pub fn dispatcher_for<U, R>(strategy: Strategy) -> BatchResult<Box<dyn Dispatcher<U, R>>>
where
    U: ConversionUnit + 'static,
    R: ProgressReporter + 'static,
{
    match strategy {
        Strategy::GatedThreads => Ok(Box::new(GatedSpawner::new())),
        Strategy::QueuePool => Ok(Box::new(QueuePool::new())),
        #[cfg(target_os = "linux")]
        Strategy::ProcessPool => Ok(Box::new(ProcessPool::new())),
        #[cfg(not(target_os = "linux"))]
        Strategy::ProcessPool => Err(crate::core::BatchError::configuration(
            "プロセス戦略はLinuxでのみ利用できます",
        )),
    }
}
