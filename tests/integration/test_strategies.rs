// 3つの戦略が同じ結果を出すことの検証

use crate::fixtures::*;
use gray_batch::dispatch::{DispatchContext, QueuePool, Dispatcher, CancelToken};
use gray_batch::{CodecError, ConversionUnit, Job, NoOpProgressReporter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_every_strategy_converts_every_job() {
    for strategy in ALL_STRATEGIES {
        // N=1, N<K, N=K, N>K
        for concurrency in [1, 3, 7, 64] {
            let temp_dir = image_folder(7);

            let summary = run_batch(temp_dir.path(), strategy, concurrency);

            assert_eq!(summary.total_jobs, 7, "{strategy} x{concurrency}");
            assert_eq!(summary.succeeded, 7, "{strategy} x{concurrency}");
            assert_eq!(count_outputs(temp_dir.path()), 7);
        }
    }
}

#[test]
fn test_strategies_produce_identical_outputs() {
    let mut outputs = Vec::new();
    for strategy in ALL_STRATEGIES {
        let temp_dir = image_folder(4);
        run_batch(temp_dir.path(), strategy, 2);

        let bytes: Vec<Vec<u8>> = (0..4)
            .map(|i| {
                image::open(temp_dir.path().join(format!("out_img{i:03}.png")))
                    .unwrap()
                    .to_rgb8()
                    .into_raw()
            })
            .collect();
        outputs.push(bytes);
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[test]
fn test_empty_folder_for_every_strategy() {
    for strategy in ALL_STRATEGIES {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let summary = run_batch(temp_dir.path(), strategy, 2);
        assert_eq!(summary.total_jobs, 0);
    }
}

/// 同時実行数の最大値を記録する変換ユニット
#[derive(Default)]
struct PeakUnit {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ConversionUnit for PeakUnit {
    fn convert(&self, _source: &Path, _destination: &Path) -> Result<(), CodecError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(5));
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_queue_pool_respects_ceiling_through_public_api() {
    let unit = Arc::new(PeakUnit::default());
    let jobs: Vec<Job> = (0..30)
        .map(|i| Job::new(format!("{i}.png"), format!("out_{i}.png")))
        .collect();
    let ctx = Arc::new(DispatchContext::new(
        Arc::clone(&unit),
        Arc::new(NoOpProgressReporter::new()),
        3,
        jobs.len(),
        CancelToken::new(),
    ));

    let outcomes = QueuePool::new().dispatch(jobs, &ctx).unwrap();

    assert_eq!(outcomes.len(), 30);
    assert!(unit.peak.load(Ordering::SeqCst) <= 3);
}
