// 戦略B - 固定数のワーカーが共有キューからジョブを取り出す
//
// ワーカーの状態遷移: Idle -> (キュー非空) -> Dequeuing -> Executing -> Idle
// 変換の実行中はキューのロックを保持しない。

use super::queue::{Dequeued, TaskQueue};
use super::{DispatchContext, Dispatcher, Strategy};
use crate::core::{
    BatchError, BatchResult, ConversionUnit, FailureKind, Job, JobOutcome, ProgressReporter,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

struct Worker {
    id: usize,
    handle: JoinHandle<Vec<JobOutcome>>,
}

/// 起動済みのワーカープール
///
/// ワーカー数は起動時に固定され、`shutdown()` で全員を join する。
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// `ctx.concurrency()` 個のワーカーを起動する
    ///
    /// 一部のワーカーの起動に失敗しても、起動できたワーカーだけで続行する。
    /// 1つも起動できなければリソースエラー。
    pub fn start<U, R>(ctx: &Arc<DispatchContext<U, R>>) -> BatchResult<Self>
    where
        U: ConversionUnit + 'static,
        R: ProgressReporter + 'static,
    {
        let queue = Arc::new(TaskQueue::new());
        let mut workers = Vec::with_capacity(ctx.concurrency());

        for id in 0..ctx.concurrency() {
            let worker_queue = Arc::clone(&queue);
            let worker_ctx = Arc::clone(ctx);
            match thread::Builder::new()
                .name(format!("pool-{id}"))
                .spawn(move || worker_loop(id, &worker_queue, &worker_ctx))
            {
                Ok(handle) => workers.push(Worker { id, handle }),
                Err(e) => warn!(worker = id, error = %e, "Failed to spawn pool worker"),
            }
        }

        if workers.is_empty() {
            queue.close();
            return Err(BatchError::resource(
                "worker threads",
                "ワーカーを1つも起動できませんでした",
            ));
        }

        info!(count = workers.len(), "Pool workers spawned");
        Ok(Self { queue, workers })
    }

    /// ジョブをキューに追加する
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        self.queue.push(job)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// キューを閉じ、残りのジョブを消化させてから全ワーカーを join する
    ///
    /// ワーカーが全滅してキューにジョブが残った場合、そのジョブは
    /// `FailureKind::Lost` として結果に含める。
    pub fn shutdown<U, R>(self, ctx: &DispatchContext<U, R>) -> Vec<JobOutcome>
    where
        U: ConversionUnit,
        R: ProgressReporter,
    {
        self.queue.close();

        let mut outcomes = Vec::new();
        for worker in self.workers {
            match worker.handle.join() {
                Ok(mut finished) => outcomes.append(&mut finished),
                Err(_) => error!(worker = worker.id, "Pool worker panicked outside a job"),
            }
        }

        // クローズ済みなので pop() はブロックしない
        while let Some(Dequeued { job, .. }) = self.queue.pop() {
            outcomes.push(ctx.finish(JobOutcome::failure(
                job,
                FailureKind::Lost,
                "no pool worker left to run the job",
            )));
        }
        outcomes
    }
}

fn worker_loop<U, R>(id: usize, queue: &TaskQueue, ctx: &DispatchContext<U, R>) -> Vec<JobOutcome>
where
    U: ConversionUnit,
    R: ProgressReporter,
{
    let mut outcomes = Vec::new();

    while let Some(Dequeued { ticket, job }) = queue.pop() {
        trace!(worker = id, ticket, path = %job.source().display(), "Dequeued job");

        let outcome = if ctx.is_cancelled() {
            JobOutcome::cancelled(job)
        } else {
            ctx.execute(&job)
        };
        outcomes.push(ctx.finish(outcome));
    }

    debug!(worker = id, processed = outcomes.len(), "Pool worker exiting");
    outcomes
}

/// キュー方式のワーカープール・ディスパッチャー
#[derive(Debug, Default, Clone, Copy)]
pub struct QueuePool;

impl QueuePool {
    pub fn new() -> Self {
        Self
    }
}

impl<U, R> Dispatcher<U, R> for QueuePool
where
    U: ConversionUnit + 'static,
    R: ProgressReporter + 'static,
{
    fn strategy(&self) -> Strategy {
        Strategy::QueuePool
    }

    fn dispatch(
        &self,
        jobs: Vec<Job>,
        ctx: &Arc<DispatchContext<U, R>>,
    ) -> BatchResult<Vec<JobOutcome>> {
        let pool = WorkerPool::start(ctx)?;
        let mut rejected = Vec::new();

        // ワーカーの消費と並行してジョブを流し込む
        for job in jobs {
            if let Err(job) = pool.submit(job) {
                rejected.push(job);
            }
        }

        let mut outcomes = pool.shutdown(ctx.as_ref());
        for job in rejected {
            outcomes.push(ctx.finish(JobOutcome::failure(
                job,
                FailureKind::Spawn,
                "task queue closed before the job was submitted",
            )));
        }

        Ok(outcomes)
    }
}
