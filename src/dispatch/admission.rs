// 許可トークンプール - スレッド間で共有するカウンティングセマフォ

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// 同時実行上限 N を表すトークンプール
///
/// カウンターは N で始まり、取得で減り、解放で増える。
/// カウンターが 0 の間、取得側はブロックする。
#[derive(Debug)]
pub struct AdmissionTokens {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl AdmissionTokens {
    pub fn new(capacity: usize) -> Self {
        Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    /// トークンを1つ取得する（空くまでブロック）
    pub fn acquire(self: &Arc<Self>) -> AdmissionToken {
        let mut available = self.lock();
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;

        AdmissionToken {
            pool: Arc::clone(self),
        }
    }

    /// ブロックせずにトークンの取得を試みる
    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionToken> {
        let mut available = self.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;

        Some(AdmissionToken {
            pool: Arc::clone(self),
        })
    }

    pub fn available(&self) -> usize {
        *self.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut available = self.lock();
        *available += 1;
        debug_assert!(*available <= self.capacity);
        self.released.notify_one();
    }

    // カウンターはロック中にパニックしないため、poisonされても値は整合している
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// 取得済みトークン。ドロップ時にプールへ返却される
#[derive(Debug)]
pub struct AdmissionToken {
    pool: Arc<AdmissionTokens>,
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        self.pool.release();
    }
}
