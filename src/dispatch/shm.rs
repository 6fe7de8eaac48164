// プロセス間共有メモリと、その上に置くカウンティングセマフォ
//
// 匿名共有マッピング (MAP_SHARED | MAP_ANONYMOUS) は fork した子プロセスに
// 同じ物理ページとして引き継がれるため、親子で同じ値を観測できる。

use crate::core::{BatchError, BatchResult};
use std::io;
use std::mem::{self, MaybeUninit};
use std::ops::Deref;
use std::ptr::{self, NonNull};
use std::time::Duration;

/// fork をまたいで共有される値の領域
///
/// `T` はヒープを所有しない型（アトミック整数や `sem_t` など）に限る。
pub struct SharedRegion<T> {
    ptr: NonNull<T>,
}

// 共有先へのアクセスは T 自身の同期に任せる
unsafe impl<T: Send + Sync> Send for SharedRegion<T> {}
unsafe impl<T: Send + Sync> Sync for SharedRegion<T> {}

impl<T> SharedRegion<T> {
    pub fn new(value: T) -> BatchResult<Self> {
        let len = mem::size_of::<T>().max(1);

        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(BatchError::resource(
                "shared memory",
                format!("mmap failed: {}", io::Error::last_os_error()),
            ));
        }

        let ptr = NonNull::new(raw.cast::<T>()).ok_or_else(|| {
            BatchError::resource("shared memory", "mmap returned a null mapping")
        })?;
        // mmap はページ境界に揃っているので T のアラインメントを満たす
        unsafe { ptr.as_ptr().write(value) };

        Ok(Self { ptr })
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> Deref for SharedRegion<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> Drop for SharedRegion<T> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            libc::munmap(self.ptr.as_ptr().cast(), mem::size_of::<T>().max(1));
        }
    }
}

/// プロセス間で共有される POSIX 無名セマフォ
///
/// 値は空きスロット数。取得で減り、解放で増え、0 の間は取得がブロックする。
pub struct ProcessSemaphore {
    region: SharedRegion<MaybeUninit<libc::sem_t>>,
}

impl ProcessSemaphore {
    pub fn new(permits: usize) -> BatchResult<Self> {
        let permits = libc::c_uint::try_from(permits).map_err(|_| {
            BatchError::configuration(format!("スロット数が大きすぎます: {permits}"))
        })?;

        let region = SharedRegion::new(MaybeUninit::<libc::sem_t>::uninit())?;
        // pshared = 1: 共有メモリ上に置き、プロセス間で使う
        let rc = unsafe { libc::sem_init(region.as_ptr().cast(), 1, permits) };
        if rc != 0 {
            return Err(BatchError::resource(
                "semaphore",
                format!("sem_init failed: {}", io::Error::last_os_error()),
            ));
        }

        Ok(Self { region })
    }

    fn sem(&self) -> *mut libc::sem_t {
        self.region.as_ptr().cast()
    }

    /// 最大 `timeout` だけ待ってスロットを1つ取得する
    ///
    /// タイムアウトした場合は `Ok(false)`。
    pub fn acquire_timeout(&self, timeout: Duration) -> io::Result<bool> {
        let deadline = realtime_deadline(timeout)?;
        loop {
            if unsafe { libc::sem_timedwait(self.sem(), &deadline) } == 0 {
                return Ok(true);
            }
            let error = io::Error::last_os_error();
            match error.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ETIMEDOUT) => return Ok(false),
                _ => return Err(error),
            }
        }
    }

    /// ブロックせずに取得を試みる
    pub fn try_acquire(&self) -> io::Result<bool> {
        loop {
            if unsafe { libc::sem_trywait(self.sem()) } == 0 {
                return Ok(true);
            }
            let error = io::Error::last_os_error();
            match error.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::EAGAIN) => return Ok(false),
                _ => return Err(error),
            }
        }
    }

    /// スロットを1つ返却する（sem_post は async-signal-safe）
    pub fn release(&self) -> io::Result<()> {
        if unsafe { libc::sem_post(self.sem()) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    /// 現在の空きスロット数
    pub fn available(&self) -> io::Result<usize> {
        let mut value: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(self.sem(), &mut value) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(value.max(0) as usize)
    }
}

impl Drop for ProcessSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_destroy(self.sem());
        }
    }
}

fn realtime_deadline(timeout: Duration) -> io::Result<libc::timespec> {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut nanos = now.tv_nsec as i64 + i64::from(timeout.subsec_nanos());
    let mut secs = now.tv_sec as i64 + timeout.as_secs() as i64;
    if nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }

    Ok(libc::timespec {
        tv_sec: secs as libc::time_t,
        tv_nsec: nanos as libc::c_long,
    })
}
