// ジョブ単位の失敗とバッチ単位のエラーの扱い

use crate::fixtures::*;
use gray_batch::{
    BatchConfig, BatchError, CodecErrorKind, FailureKind, GrayscaleConverter,
    NoOpProgressReporter, RunCoordinator, Strategy,
};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

#[test]
fn test_bad_signature_fails_alone() {
    for strategy in ALL_STRATEGIES {
        let temp_dir = TempDir::new().unwrap();
        write_not_png(temp_dir.path(), "a.png");
        write_png(temp_dir.path(), "b.png", [0, 0, 255]);

        let summary = run_batch(temp_dir.path(), strategy, 2);

        assert_eq!(summary.succeeded, 1, "{strategy}");
        assert_eq!(summary.failed, 1, "{strategy}");
        assert!(summary.failures[0].source.ends_with("a.png"));
        assert_eq!(
            summary.failures[0].kind,
            FailureKind::Codec {
                kind: CodecErrorKind::NotAnImage
            }
        );
        assert!(temp_dir.path().join("out_b.png").exists());
        assert!(!temp_dir.path().join("out_a.png").exists());
    }
}

#[test]
fn test_rgba_input_is_unsupported_layout() {
    let temp_dir = TempDir::new().unwrap();
    RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]))
        .save(temp_dir.path().join("alpha.png"))
        .unwrap();

    let summary = run_batch(temp_dir.path(), Strategy::ProcessPool, 1);

    assert_eq!(summary.failed, 1);
    assert_eq!(
        summary.failures[0].kind,
        FailureKind::Codec {
            kind: CodecErrorKind::UnsupportedLayout
        }
    );
}

#[test]
fn test_unreadable_folder_aborts_before_dispatch() {
    let temp_dir = TempDir::new().unwrap();
    let config = BatchConfig::new(temp_dir.path().join("does-not-exist"))
        .with_strategy(Strategy::GatedThreads);

    let error = RunCoordinator::new(GrayscaleConverter::new(), NoOpProgressReporter::new(), config)
        .run()
        .unwrap_err();

    assert!(matches!(error, BatchError::DirectoryUnreadable { .. }));
    assert!(error.is_configuration());
}

#[test]
fn test_mixed_folder_accounts_for_every_file() {
    let temp_dir = image_folder(5);
    write_not_png(temp_dir.path(), "notes.txt");
    write_not_png(temp_dir.path(), "zz.png");

    let summary = run_batch(temp_dir.path(), Strategy::QueuePool, 3);

    assert_eq!(summary.total_jobs, 7);
    assert_eq!(summary.succeeded + summary.failed, summary.total_jobs);
    assert_eq!(summary.failed, 2);
}
