// バッチ設定の具象実装

use crate::core::{BatchError, BatchResult};
use crate::dispatch::Strategy;
use std::path::{Path, PathBuf};

/// 出力ファイル名の既定の接頭辞
pub const DEFAULT_OUTPUT_PREFIX: &str = "out_";

/// 1回のバッチ実行の設定
#[derive(Debug, Clone)]
pub struct BatchConfig {
    folder: PathBuf,
    concurrency: usize,
    strategy: Strategy,
    output_prefix: String,
    enable_progress: bool,
    report_path: Option<PathBuf>,
}

impl BatchConfig {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    pub fn with_progress_reporting(mut self, enable: bool) -> Self {
        self.enable_progress = enable;
        self
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn progress_enabled(&self) -> bool {
        self.enable_progress
    }

    pub fn report_path(&self) -> Option<&Path> {
        self.report_path.as_deref()
    }

    /// ディスパッチ前の検証
    pub fn validate(&self) -> BatchResult<()> {
        if self.concurrency == 0 {
            return Err(BatchError::configuration(
                "並列数は1以上である必要があります",
            ));
        }
        if self.output_prefix.is_empty() {
            return Err(BatchError::configuration("出力接頭辞が空です"));
        }
        if self.output_prefix.contains(['/', std::path::MAIN_SEPARATOR]) {
            return Err(BatchError::configuration(format!(
                "出力接頭辞にパス区切り文字は使えません: {}",
                self.output_prefix
            )));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("."),
            concurrency: num_cpus::get().max(1),
            strategy: Strategy::QueuePool,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            enable_progress: true,
            report_path: None,
        }
    }
}
