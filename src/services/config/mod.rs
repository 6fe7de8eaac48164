// バッチ設定
// 並列数・戦略・出力名の接頭辞などを保持し、実行前に検証する

pub mod implementations;

// 公開API
pub use implementations::{BatchConfig, DEFAULT_OUTPUT_PREFIX};
