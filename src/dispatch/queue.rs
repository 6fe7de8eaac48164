// タスクキュー - 排他ロックと条件変数で保護されたFIFO
//
// 容量は無制限（生産者は消費より先に列挙してよい）。`close()` 後は
// 残りのジョブを取り出し終えた時点で `pop()` が `None` を返す。

use crate::core::Job;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// キューから取り出されたジョブと取り出し順の通し番号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dequeued {
    pub ticket: u64,
    pub job: Job,
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    closed: bool,
    next_ticket: u64,
}

/// ワーカープールで共有されるジョブキュー
#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// ジョブを末尾に追加し、待機中のワーカーを1つ起こす
    ///
    /// クローズ済みの場合はジョブをそのまま返す。
    pub fn push(&self, job: Job) -> Result<(), Job> {
        let mut state = self.lock();
        if state.closed {
            return Err(job);
        }
        state.jobs.push_back(job);
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// 先頭のジョブを取り出す（空の間はブロック）
    ///
    /// キューがクローズされ、かつ空になったら `None`。
    pub fn pop(&self) -> Option<Dequeued> {
        let mut state = self.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                let ticket = state.next_ticket;
                state.next_ticket += 1;
                return Some(Dequeued { ticket, job });
            }
            if state.closed {
                return None;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// これ以上ジョブが追加されないことを通知し、全ワーカーを起こす
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    // 状態の更新はロック中にパニックしない
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
