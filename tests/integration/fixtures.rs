// テスト用の画像ディレクトリ生成ヘルパー

use gray_batch::{BatchConfig, BatchSummary, GrayscaleConverter, NoOpProgressReporter, RunCoordinator, Strategy};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const ALL_STRATEGIES: [Strategy; 3] = [
    Strategy::GatedThreads,
    Strategy::QueuePool,
    Strategy::ProcessPool,
];

/// 単色の RGB PNG を書き出す
pub fn write_png(dir: &Path, name: &str, color: [u8; 3]) {
    RgbImage::from_pixel(4, 3, Rgb(color))
        .save(dir.join(name))
        .unwrap();
}

/// `count` 枚の RGB PNG を含む一時ディレクトリ
pub fn image_folder(count: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..count {
        let shade = (i * 37 % 256) as u8;
        write_png(temp_dir.path(), &format!("img{i:03}.png"), [shade, 255 - shade, 90]);
    }
    temp_dir
}

/// PNGシグネチャを持たないファイルを書き出す
pub fn write_not_png(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"this is not an image").unwrap();
}

/// 標準の変換ユニットでバッチを実行する
pub fn run_batch(folder: &Path, strategy: Strategy, concurrency: usize) -> BatchSummary {
    let config = BatchConfig::new(folder)
        .with_strategy(strategy)
        .with_concurrency(concurrency)
        .with_progress_reporting(false);
    RunCoordinator::new(GrayscaleConverter::new(), NoOpProgressReporter::new(), config)
        .run()
        .unwrap()
}

/// 出力画像の全画素が同じ値 `gray` を持つか
pub fn assert_uniform_gray(path: &Path, gray: u8) {
    let image = image::open(path).unwrap().to_rgb8();
    for pixel in image.pixels() {
        assert_eq!(pixel.0, [gray, gray, gray], "{}", path.display());
    }
}

/// `out_` で始まるファイルの数
pub fn count_outputs(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("out_"))
        .count()
}
