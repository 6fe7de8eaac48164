// 実ファイルを使ったエンドツーエンドの変換テスト

use crate::fixtures::*;
use gray_batch::{JobEnumerator, Strategy};
use tempfile::TempDir;

#[test]
fn test_red_and_green_become_gray_85() {
    let temp_dir = TempDir::new().unwrap();
    write_png(temp_dir.path(), "a.png", [255, 0, 0]);
    write_png(temp_dir.path(), "b.png", [0, 255, 0]);

    let summary = run_batch(temp_dir.path(), Strategy::GatedThreads, 2);

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert_uniform_gray(&temp_dir.path().join("out_a.png"), 85);
    assert_uniform_gray(&temp_dir.path().join("out_b.png"), 85);
}

#[test]
fn test_pixel_average_truncates() {
    let temp_dir = TempDir::new().unwrap();
    write_png(temp_dir.path(), "white.png", [255, 255, 255]);
    write_png(temp_dir.path(), "mixed.png", [10, 20, 31]);

    let summary = run_batch(temp_dir.path(), Strategy::QueuePool, 1);

    assert_eq!(summary.succeeded, 2);
    assert_uniform_gray(&temp_dir.path().join("out_white.png"), 255);
    assert_uniform_gray(&temp_dir.path().join("out_mixed.png"), 20);
}

#[test]
fn test_rerun_skips_existing_outputs() {
    let temp_dir = image_folder(3);

    let first = run_batch(temp_dir.path(), Strategy::QueuePool, 2);
    let second = run_batch(temp_dir.path(), Strategy::QueuePool, 2);

    assert_eq!(first.total_jobs, 3);
    assert_eq!(second.total_jobs, 3);
    assert_eq!(count_outputs(temp_dir.path()), 3);
}

#[test]
fn test_subdirectories_are_not_jobs() {
    let temp_dir = image_folder(2);
    std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
    write_png(&temp_dir.path().join("nested"), "deep.png", [1, 2, 3]);

    let jobs: Vec<_> = JobEnumerator::open(temp_dir.path(), "out_").unwrap().collect();
    let summary = run_batch(temp_dir.path(), Strategy::GatedThreads, 4);

    assert_eq!(jobs.len(), 2);
    assert_eq!(summary.total_jobs, 2);
    assert!(!temp_dir.path().join("nested/out_deep.png").exists());
}
