// サービス層 - バッチ実行を取り巻く設定・進捗表示・レポート出力

pub mod config;
pub mod monitoring;
pub mod report;

// 公開API
pub use config::BatchConfig;
pub use monitoring::{ConsoleProgressReporter, NoOpProgressReporter, TracingProgressReporter};
pub use report::{BatchReport, JsonReportWriter};
