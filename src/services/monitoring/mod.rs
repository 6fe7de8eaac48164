// 進捗監視機能
// 開始通知、ジョブ完了ごとの進捗、完了サマリー

pub mod implementations;

// 公開API
pub use implementations::{ConsoleProgressReporter, NoOpProgressReporter, TracingProgressReporter};
