//! gray_batch - RGB PNG画像のバッチ・グレースケール変換
//!
//! 作業ディレクトリ直下のファイルを1件ずつジョブにし、3つの並行戦略
//! （許可トークン付きスレッド・キュー型ワーカープール・fork型プロセスプール）
//! のいずれかで変換ユニットへ配る。どの戦略でも同時実行数は N 以下に保たれ、
//! 全ジョブの成功・失敗がサマリーに集計される。

pub mod cli;
pub mod codec;
pub mod coordinator;
pub mod core;
pub mod dispatch;
pub mod enumerator;
pub mod services;

// 主要な型の再エクスポート
pub use codec::GrayscaleConverter;
pub use coordinator::RunCoordinator;
pub use crate::core::{
    BatchError, BatchResult, BatchSummary, CodecError, CodecErrorKind, ConversionUnit,
    FailureKind, Job, JobOutcome, ProgressReporter,
};
pub use dispatch::{CancelToken, Strategy};
pub use enumerator::JobEnumerator;
pub use services::{BatchConfig, ConsoleProgressReporter, NoOpProgressReporter};
