// バッチ処理に関連するデータ型定義

use crate::core::error::CodecErrorKind;
use serde::{Deserialize, Serialize};
use serde::Serializer;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 1枚の画像変換を表すジョブ（作成後は不変）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    source: PathBuf,
    destination: PathBuf,
}

impl Job {
    /// 作業ディレクトリとエントリ名からジョブを作成
    ///
    /// 出力先は `<folder>/<prefix><name>` で、入力名から一意に決まる。
    /// 名前が UTF-8 でなくてもそのままのバイト列で組み立てる。
    pub fn from_entry(folder: &Path, name: &OsStr, output_prefix: &str) -> Self {
        let mut output_name = OsString::from(output_prefix);
        output_name.push(name);

        Self {
            source: folder.join(name),
            destination: folder.join(output_name),
        }
    }

    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

/// ジョブ失敗の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureKind {
    /// 変換ユニットがエラーを返した
    Codec { kind: CodecErrorKind },
    /// スレッドまたはプロセスの生成に失敗
    Spawn,
    /// 変換中にパニックが発生
    Panicked,
    /// 子プロセスがシグナルで終了
    Crashed { signal: i32 },
    /// 実行開始前にキャンセルされた
    Cancelled,
    /// 子プロセスの終了状態を回収できなかった
    Lost,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec { kind } => write!(f, "codec:{}", kind.as_str()),
            Self::Spawn => f.write_str("spawn"),
            Self::Panicked => f.write_str("panicked"),
            Self::Crashed { signal } => write!(f, "crashed(signal {signal})"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Lost => f.write_str("lost"),
        }
    }
}

/// 個別ジョブの結果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success {
        job: Job,
        elapsed: Duration,
    },
    Failure {
        job: Job,
        kind: FailureKind,
        message: String,
    },
}

impl JobOutcome {
    pub fn failure(job: Job, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            job,
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled(job: Job) -> Self {
        Self::failure(job, FailureKind::Cancelled, "batch cancelled before the job started")
    }

    pub fn job(&self) -> &Job {
        match self {
            Self::Success { job, .. } | Self::Failure { job, .. } => job,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// 失敗ジョブのレポート用レコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJob {
    // UTF-8 でないパスもレポートに残せるよう、置換文字で書き出す
    #[serde(serialize_with = "serialize_lossy_path")]
    pub source: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

fn serialize_lossy_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// バッチ全体のサマリー
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub strategy: &'static str,
    pub concurrency: usize,
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub failures: Vec<FailedJob>,
}

impl BatchSummary {
    /// ジョブ結果を集計してサマリーを作成
    pub fn from_outcomes(
        strategy: &'static str,
        concurrency: usize,
        outcomes: &[JobOutcome],
        elapsed: Duration,
    ) -> Self {
        let failures: Vec<FailedJob> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                JobOutcome::Success { .. } => None,
                JobOutcome::Failure { job, kind, message } => Some(FailedJob {
                    source: job.source().to_path_buf(),
                    kind: *kind,
                    message: message.clone(),
                }),
            })
            .collect();

        Self {
            strategy,
            concurrency,
            total_jobs: outcomes.len(),
            succeeded: outcomes.len() - failures.len(),
            failed: failures.len(),
            elapsed,
            failures,
        }
    }
}
