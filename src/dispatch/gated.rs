// 戦略A - ジョブごとのスレッドを許可トークンで制限する
//
// トークンはスレッド作成「前」に取得するため、上限 N は実行だけでなく
// 作成数も制限する。スレッドハンドルは N 個のスロット表にラウンドロビンで
// 格納し、スロットを再利用する前に以前のスレッドを必ず join する。

use super::admission::AdmissionTokens;
use super::{DispatchContext, Dispatcher, Strategy};
use crate::core::{
    BatchResult, ConversionUnit, FailureKind, Job, JobOutcome, ProgressReporter,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// 許可トークン付きスレッド生成ディスパッチャー
#[derive(Debug, Default, Clone, Copy)]
pub struct GatedSpawner;

impl GatedSpawner {
    pub fn new() -> Self {
        Self
    }
}

/// スロットを占有しているスレッド
struct Occupant {
    job: Job,
    handle: JoinHandle<JobOutcome>,
}

impl Occupant {
    fn join(self) -> JobOutcome {
        match self.handle.join() {
            Ok(outcome) => outcome,
            // execute() 内のパニックは捕捉済み。ここに来るのは報告処理中のパニックのみ
            Err(_) => JobOutcome::failure(self.job, FailureKind::Panicked, "worker thread panicked"),
        }
    }
}

impl<U, R> Dispatcher<U, R> for GatedSpawner
where
    U: ConversionUnit + 'static,
    R: ProgressReporter + 'static,
{
    fn strategy(&self) -> Strategy {
        Strategy::GatedThreads
    }

    fn dispatch(
        &self,
        jobs: Vec<Job>,
        ctx: &Arc<DispatchContext<U, R>>,
    ) -> BatchResult<Vec<JobOutcome>> {
        let capacity = ctx.concurrency();
        let tokens = Arc::new(AdmissionTokens::new(capacity));
        let mut slots: Vec<Option<Occupant>> = (0..capacity).map(|_| None).collect();
        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut spawned = 0usize;

        for job in jobs {
            if ctx.is_cancelled() {
                outcomes.push(ctx.finish(JobOutcome::cancelled(job)));
                continue;
            }

            let token = tokens.acquire();

            // 待機中にキャンセルされた場合
            if ctx.is_cancelled() {
                drop(token);
                outcomes.push(ctx.finish(JobOutcome::cancelled(job)));
                continue;
            }

            let slot = spawned % capacity;
            if let Some(previous) = slots[slot].take() {
                outcomes.push(previous.join());
            }

            let worker_ctx = Arc::clone(ctx);
            let worker_job = job.clone();
            let spawn_result = thread::Builder::new()
                .name(format!("gated-{slot}"))
                .spawn(move || {
                    let _token = token;
                    let outcome = worker_ctx.execute(&worker_job);
                    worker_ctx.finish(outcome)
                });

            match spawn_result {
                Ok(handle) => {
                    debug!(slot, path = %job.source().display(), "Spawned gated worker");
                    slots[slot] = Some(Occupant { job, handle });
                    spawned += 1;
                }
                Err(e) => {
                    // クロージャと一緒にトークンも破棄され、プールへ返却済み
                    warn!(error = %e, path = %job.source().display(), "Failed to spawn thread");
                    outcomes.push(ctx.finish(JobOutcome::failure(
                        job,
                        FailureKind::Spawn,
                        format!("thread spawn failed: {e}"),
                    )));
                }
            }
        }

        for occupant in slots.into_iter().flatten() {
            outcomes.push(occupant.join());
        }

        info!(spawned, "All gated workers joined");
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::test_support::{GaugeUnit, PanickyReporter};
    use crate::dispatch::CancelToken;
    use crate::services::NoOpProgressReporter;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn jobs(count: usize) -> Vec<Job> {
        (0..count)
            .map(|i| Job::new(format!("img{i}.png"), format!("out_img{i}.png")))
            .collect()
    }

    fn run(unit: Arc<GaugeUnit>, jobs: Vec<Job>, concurrency: usize) -> Vec<JobOutcome> {
        let ctx = Arc::new(DispatchContext::new(
            unit,
            Arc::new(NoOpProgressReporter::new()),
            concurrency,
            jobs.len(),
            CancelToken::new(),
        ));
        GatedSpawner::new().dispatch(jobs, &ctx).unwrap()
    }

    #[test]
    fn test_every_job_runs_once() {
        for concurrency in [1, 4, 8, 16] {
            let unit = Arc::new(GaugeUnit::default());
            let outcomes = run(Arc::clone(&unit), jobs(8), concurrency);

            assert_eq!(outcomes.len(), 8);
            assert_eq!(unit.calls.load(Ordering::SeqCst), 8);
            let unique: HashSet<_> = outcomes.iter().map(|o| o.job().clone()).collect();
            assert_eq!(unique.len(), 8);
        }
    }

    #[test]
    fn test_concurrency_never_exceeds_ceiling() {
        let unit = Arc::new(GaugeUnit::holding(Duration::from_millis(20)));
        let outcomes = run(Arc::clone(&unit), jobs(12), 3);

        assert_eq!(outcomes.len(), 12);
        assert!(unit.peak.load(Ordering::SeqCst) <= 3);
        assert!(unit.peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_failures_do_not_stop_siblings() {
        let unit = Arc::new(GaugeUnit::default());
        let mut batch = jobs(3);
        batch.push(Job::new("broken.png", "out_broken.png"));

        let outcomes = run(unit, batch, 2);

        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 3);
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].job().source().ends_with("broken.png"));
    }

    #[test]
    fn test_cancelled_batch_reports_every_job() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let unit = Arc::new(GaugeUnit::default());
        let ctx = Arc::new(DispatchContext::new(
            Arc::clone(&unit),
            Arc::new(NoOpProgressReporter::new()),
            2,
            5,
            cancel,
        ));

        let outcomes = GatedSpawner::new().dispatch(jobs(5), &ctx).unwrap();

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| matches!(
            o,
            JobOutcome::Failure {
                kind: FailureKind::Cancelled,
                ..
            }
        )));
        assert_eq!(unit.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reporter_panic_keeps_real_outcome() {
        let reporter = Arc::new(PanickyReporter::default());
        let ctx = Arc::new(DispatchContext::new(
            Arc::new(GaugeUnit::default()),
            Arc::clone(&reporter),
            2,
            5,
            CancelToken::new(),
        ));

        let outcomes = GatedSpawner::new().dispatch(jobs(5), &ctx).unwrap();

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| o.is_success()));
        assert_eq!(reporter.finished.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_empty_batch() {
        let outcomes = run(Arc::new(GaugeUnit::default()), Vec::new(), 4);
        assert!(outcomes.is_empty());
    }
}
