// バッチレポート出力
// 集計結果と失敗ジョブの一覧を JSON で保存する

pub mod implementations;

// 公開API
pub use implementations::{BatchReport, JsonReportWriter};
