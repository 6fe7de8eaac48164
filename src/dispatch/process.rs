// 戦略C - fork した子プロセスでジョブを実行する
//
// 空きスロット数は共有メモリ上のプロセス間セマフォが持つ。親は fork 前に
// スロットを取得し、子は変換後に sem_post で返却してから終了する。
// シグナルで死んだ子は返却できないため、親が回収時に代わりに返却する。

use super::shm::ProcessSemaphore;
use super::{DispatchContext, Dispatcher, Strategy};
use crate::core::{
    BatchError, BatchResult, CodecErrorKind, ConversionUnit, FailureKind, Job, JobOutcome,
    ProgressReporter,
};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 子プロセスで変換がパニックした場合の終了コード
pub const PANIC_EXIT_CODE: i32 = 70;

/// スロット待ちの間に終了済みの子を回収する間隔
const REAP_INTERVAL: Duration = Duration::from_millis(20);

/// fork 方式のプロセスプール・ディスパッチャー
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessPool;

impl ProcessPool {
    pub fn new() -> Self {
        Self
    }
}

struct Child {
    pid: libc::pid_t,
    job: Job,
    started: Instant,
}

impl Child {
    /// 終了状態をジョブ結果に変換する
    fn into_outcome(self, status: ExitStatus, slots: &ProcessSemaphore) -> JobOutcome {
        if let Some(signal) = status.signal() {
            if let Err(e) = slots.release() {
                warn!(pid = self.pid, error = %e, "Failed to return slot of crashed child");
            }
            return JobOutcome::failure(
                self.job,
                FailureKind::Crashed { signal },
                format!("child {} killed by signal {signal}", self.pid),
            );
        }

        match status.code() {
            Some(0) => JobOutcome::Success {
                job: self.job,
                elapsed: self.started.elapsed(),
            },
            Some(PANIC_EXIT_CODE) => JobOutcome::failure(
                self.job,
                FailureKind::Panicked,
                format!("conversion panicked in child {}", self.pid),
            ),
            Some(code) => match CodecErrorKind::from_exit_code(code) {
                Some(kind) => JobOutcome::failure(
                    self.job,
                    FailureKind::Codec { kind },
                    format!("child {} failed: {}", self.pid, kind.as_str()),
                ),
                None => JobOutcome::failure(
                    self.job,
                    FailureKind::Lost,
                    format!("child {} exited with unexpected code {code}", self.pid),
                ),
            },
            None => JobOutcome::failure(
                self.job,
                FailureKind::Lost,
                format!("child {} ended with unknown status", self.pid),
            ),
        }
    }
}

/// 子プロセス側の処理。戻り値は終了コード
///
/// ログ出力やロックの取得は行わない（fork 時点で他スレッドが保持している可能性がある）。
fn run_child<U: ConversionUnit>(unit: &U, job: &Job) -> i32 {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        unit.convert(job.source(), job.destination())
    }));

    match result {
        Ok(Ok(())) => 0,
        Ok(Err(error)) => error.kind().exit_code(),
        Err(_) => PANIC_EXIT_CODE,
    }
}

/// 子プロセスの終了を待つ。`block = false` なら終了済みの場合のみ状態を返す
fn wait_child(pid: libc::pid_t, block: bool) -> io::Result<Option<ExitStatus>> {
    let options = if block { 0 } else { libc::WNOHANG };
    loop {
        let mut raw = 0;
        let rc = unsafe { libc::waitpid(pid, &mut raw, options) };
        if rc == pid {
            return Ok(Some(ExitStatus::from_raw(raw)));
        }
        if rc == 0 {
            return Ok(None);
        }
        let error = io::Error::last_os_error();
        if error.kind() != io::ErrorKind::Interrupted {
            return Err(error);
        }
    }
}

struct Reaper<'a, U, R> {
    ctx: &'a DispatchContext<U, R>,
    slots: &'a ProcessSemaphore,
    children: Vec<Child>,
    outcomes: Vec<JobOutcome>,
}

impl<U, R> Reaper<'_, U, R>
where
    U: ConversionUnit,
    R: ProgressReporter,
{
    /// 終了した子を回収する。`block = true` なら全員の終了を待つ
    fn reap(&mut self, block: bool) {
        let mut index = 0;
        while index < self.children.len() {
            match wait_child(self.children[index].pid, block) {
                Ok(None) => index += 1,
                Ok(Some(status)) => {
                    let child = self.children.swap_remove(index);
                    debug!(pid = child.pid, status = %status, "Reaped child");
                    let outcome = child.into_outcome(status, self.slots);
                    self.outcomes.push(self.ctx.finish(outcome));
                }
                Err(e) => {
                    let child = self.children.swap_remove(index);
                    warn!(pid = child.pid, error = %e, "waitpid failed");
                    self.outcomes.push(self.ctx.finish(JobOutcome::failure(
                        child.job,
                        FailureKind::Lost,
                        format!("waitpid failed: {e}"),
                    )));
                }
            }
        }
    }

    fn record(&mut self, outcome: JobOutcome) {
        self.outcomes.push(self.ctx.finish(outcome));
    }
}

impl<U, R> Dispatcher<U, R> for ProcessPool
where
    U: ConversionUnit + 'static,
    R: ProgressReporter + 'static,
{
    fn strategy(&self) -> Strategy {
        Strategy::ProcessPool
    }

    fn dispatch(
        &self,
        jobs: Vec<Job>,
        ctx: &Arc<DispatchContext<U, R>>,
    ) -> BatchResult<Vec<JobOutcome>> {
        let slots = ProcessSemaphore::new(ctx.concurrency())?;
        let mut reaper = Reaper {
            ctx: ctx.as_ref(),
            slots: &slots,
            children: Vec::with_capacity(ctx.concurrency()),
            outcomes: Vec::with_capacity(jobs.len()),
        };
        let mut forked = 0usize;

        for job in jobs {
            if ctx.is_cancelled() {
                reaper.record(JobOutcome::cancelled(job));
                continue;
            }

            // 空きスロットを待つ。待機中も終了した子を回収してスロットを戻す
            loop {
                match slots.acquire_timeout(REAP_INTERVAL) {
                    Ok(true) => break,
                    Ok(false) => reaper.reap(false),
                    Err(e) => {
                        // 以降は起動できないため、起動済みの子を回収してから中断する
                        reaper.reap(true);
                        return Err(BatchError::resource(
                            "semaphore",
                            format!("sem_timedwait failed: {e}"),
                        ));
                    }
                }
            }

            if ctx.is_cancelled() {
                if let Err(e) = slots.release() {
                    warn!(error = %e, "Failed to return unused slot");
                }
                reaper.record(JobOutcome::cancelled(job));
                continue;
            }

            match unsafe { libc::fork() } {
                -1 => {
                    let error = io::Error::last_os_error();
                    if let Err(e) = slots.release() {
                        warn!(error = %e, "Failed to return slot after fork failure");
                    }
                    warn!(error = %error, path = %job.source().display(), "fork failed");
                    reaper.record(JobOutcome::failure(
                        job,
                        FailureKind::Spawn,
                        format!("fork failed: {error}"),
                    ));
                }
                0 => {
                    let code = run_child(ctx.unit(), &job);
                    let _ = slots.release();
                    // デストラクタや atexit ハンドラを実行せずに終了する
                    unsafe { libc::_exit(code) };
                }
                pid => {
                    debug!(pid, path = %job.source().display(), "Forked child");
                    forked += 1;
                    reaper.children.push(Child {
                        pid,
                        job,
                        started: Instant::now(),
                    });
                    reaper.reap(false);
                }
            }
        }

        reaper.reap(true);
        debug_assert!(reaper.children.is_empty());
        info!(forked, "All child processes reaped");

        let Reaper { outcomes, .. } = reaper;
        Ok(outcomes)
    }
}
