// グレースケール変換 - ピクセル単位の純粋関数

use image::{Rgb, RgbImage};

/// 1ピクセルのRGB平均値（整数切り捨て）
pub fn average(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    // 最大 765 / 3 = 255 なので u8 に収まる
    ((r as u16 + g as u16 + b as u16) / 3) as u8
}

/// 画像全体をその場でグレースケール化する
///
/// 各ピクセル `(r, g, b)` は `(v, v, v)`（`v = floor((r + g + b) / 3)`）になる。
pub fn to_grayscale(image: &mut RgbImage) {
    for pixel in image.pixels_mut() {
        let v = average(*pixel);
        *pixel = Rgb([v, v, v]);
    }
}
