// ジョブ列挙 - 作業ディレクトリ直下のエントリを1件ずつジョブに変換

use crate::core::{BatchError, BatchResult, Job};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// ディレクトリ直下のエントリからジョブを遅延生成する一方向イテレータ
///
/// 再列挙にはディレクトリを開き直す必要がある。読み取り途中のエラーでは
/// リトライせずに列挙を打ち切る。
pub struct JobEnumerator {
    folder: PathBuf,
    output_prefix: String,
    entries: walkdir::IntoIter,
    finished: bool,
}

impl JobEnumerator {
    /// ディレクトリを開いて列挙を準備する
    ///
    /// ディレクトリを読めない場合はディスパッチ前の設定エラーになる。
    pub fn open(folder: impl AsRef<Path>, output_prefix: impl Into<String>) -> BatchResult<Self> {
        let folder = folder.as_ref().to_path_buf();

        // WalkDirは最初のnext()まで失敗を報告しないため、ここで先に検証する
        std::fs::read_dir(&folder).map_err(|e| BatchError::directory_unreadable(&folder, e))?;

        let entries = WalkDir::new(&folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter();

        Ok(Self {
            folder,
            output_prefix: output_prefix.into(),
            entries,
            finished: false,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl Iterator for JobEnumerator {
    type Item = Job;

    fn next(&mut self) -> Option<Job> {
        if self.finished {
            return None;
        }

        loop {
            let entry = match self.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    warn!(folder = %self.folder.display(), error = %e, "Directory read failed, stopping enumeration");
                    self.finished = true;
                    return None;
                }
                None => {
                    self.finished = true;
                    return None;
                }
            };

            if entry.file_type().is_dir() {
                debug!(path = %entry.path().display(), "Skipping subdirectory");
                continue;
            }

            // 名前は UTF-8 とは限らないため OsStr のまま扱う
            let name = entry.file_name();

            // 前回の出力は入力として扱わない（再実行しても out_out_* を作らない）
            if name
                .as_encoded_bytes()
                .starts_with(self.output_prefix.as_bytes())
            {
                info!(path = %entry.path().display(), "Skipping previous output");
                continue;
            }

            return Some(Job::from_entry(&self.folder, name, &self.output_prefix));
        }
    }
}

impl FusedIterator for JobEnumerator {}
