// 変換ユニット - PNGの読み込み・グレースケール化・書き出し

use crate::core::{CodecError, ConversionUnit};
use image::{DynamicImage, ImageFormat};
use std::path::Path;

pub mod grayscale;

/// PNGファイル先頭8バイトのシグネチャ
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// RGB 8bit PNGをグレースケールに変換する標準の変換ユニット
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayscaleConverter;

impl GrayscaleConverter {
    pub fn new() -> Self {
        Self
    }

    /// シグネチャとチャンネル構成を検証してRGB画像として読み込む
    pub fn load_rgb(&self, path: &Path) -> Result<image::RgbImage, CodecError> {
        let bytes = std::fs::read(path).map_err(|e| CodecError::io(path, e))?;

        if !has_png_signature(&bytes) {
            return Err(CodecError::not_an_image(path));
        }

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).map_err(
            |source| CodecError::Decode {
                path: path.to_path_buf(),
                source,
            },
        )?;

        match decoded {
            DynamicImage::ImageRgb8(image) => Ok(image),
            other => Err(CodecError::unsupported_layout(
                path,
                format!("{:?}", other.color()),
            )),
        }
    }
}

impl ConversionUnit for GrayscaleConverter {
    fn convert(&self, source: &Path, destination: &Path) -> Result<(), CodecError> {
        let mut image = self.load_rgb(source)?;
        grayscale::to_grayscale(&mut image);

        image
            .save_with_format(destination, ImageFormat::Png)
            .map_err(|source| CodecError::Encode {
                path: destination.to_path_buf(),
                source,
            })
    }
}

fn has_png_signature(bytes: &[u8]) -> bool {
    bytes.len() >= PNG_SIGNATURE.len() && bytes[..PNG_SIGNATURE.len()] == PNG_SIGNATURE
}
